//! Summary command - list document summaries.

use super::{accept_partial, parse_filter_arg};
use crate::app::App;
use crate::OutputFormat;
use waymark_core::{filtered_summary, Config, Summary};

/// Run the summary command.
pub fn run(
    config: Config,
    filter: Option<&str>,
    strict: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let filter = parse_filter_arg(filter, strict)?;
    let app = App::new(&config)?;

    let summaries = accept_partial(filtered_summary(app.backend.as_ref(), filter.as_ref()));

    match output {
        OutputFormat::Text => {
            for summary in &summaries {
                println!("{}", format_summary(summary));
            }
            eprintln!();
            eprintln!("{} documents", summaries.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }

    Ok(())
}

/// One line per summary: id, kind and tier, description, tags.
pub fn format_summary(summary: &Summary) -> String {
    let kind = match summary.tier {
        Some(tier) => format!("{}/{}", summary.kind, tier),
        None => summary.kind.to_string(),
    };

    let mut line = format!("{:<28} {:<16} {}", summary.id, kind, summary.description);
    if !summary.tags.is_empty() {
        line.push_str(&format!(" [{}]", summary.tags.join(", ")));
    }
    line.trim_end().to_string()
}
