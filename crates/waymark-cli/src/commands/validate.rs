//! Validate command - load every backend and report rejected documents.

use crate::app::open_backend;
use waymark_backend_localfs::IndexStats;
use waymark_core::Config;

/// Run the validate command.
pub fn run(config: Config) -> anyhow::Result<()> {
    println!("Waymark Validation");
    println!("==================");
    if let Some(ref source) = config.source {
        println!("Config: {}", source.display());
    }
    println!();

    let mut failed = 0usize;
    let mut rejected = 0usize;

    for spec in &config.backends {
        println!("Backend '{}' ({}):", spec.name, spec.kind.type_name());

        let index = match open_backend(&config, spec) {
            Ok(index) => index,
            Err(e) => {
                println!("  ✗ {:#}", e);
                failed += 1;
                continue;
            }
        };

        if let Err(e) = index.initialize() {
            println!("  ✗ {}", e);
            failed += 1;
            continue;
        }

        let stats = index.stats().unwrap_or_default();
        print_stats(&stats);

        let rejections = index.rejections();
        for rejection in &rejections {
            println!(
                "    {} [{}]: {}",
                rejection.path.display(),
                rejection.entity_type,
                rejection.reason
            );
        }
        rejected += rejections.len();
        println!();
    }

    if failed > 0 || rejected > 0 {
        anyhow::bail!(
            "{} backend(s) failed to load, {} document(s) rejected",
            failed,
            rejected
        );
    }

    println!("All documents valid.");
    Ok(())
}

fn print_stats(stats: &IndexStats) {
    println!("  Discovered: {}", stats.discovered);
    println!("  Indexed:    {}", stats.indexed);
    println!("  Rejected:   {}", stats.rejected);
    println!("  Load time:  {} ms", stats.load_time_ms);
}
