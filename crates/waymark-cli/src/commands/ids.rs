//! Ids command - list the ids of matching documents.

use super::{accept_partial, parse_filter_arg};
use crate::app::App;
use crate::OutputFormat;
use waymark_core::{select_ids, Config};

/// Run the ids command.
pub fn run(config: Config, filter: &str, strict: bool, output: OutputFormat) -> anyhow::Result<()> {
    let filter = parse_filter_arg(Some(filter), strict)?;
    let app = App::new(&config)?;

    let summaries = accept_partial(app.backend.get_summary());
    let ids = select_ids(&summaries, filter.as_ref());

    match output {
        OutputFormat::Text => {
            for id in &ids {
                println!("{}", id);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }
    }

    Ok(())
}
