//! # Waymark CLI
//!
//! Command-line interface for querying guidance documents.
//!
//! ## Commands
//!
//! - `waymark summary` - List summaries, optionally filtered
//! - `waymark ids --filter <query>` - List ids of matching documents
//! - `waymark details <id>...` - Show full documents
//! - `waymark validate` - Load every backend and report rejected files
//!
//! ## Example Usage
//!
//! ```bash
//! # Every must-tier behavior
//! waymark summary --filter "type:behavior tier:must"
//!
//! # Ids of core guidance that is not obsolete
//! waymark ids --filter "tag:scope:core NOT tag:obsolete"
//!
//! # Full text of two documents as JSON
//! waymark details run-tests release --output json
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use waymark_core::Config;

/// Waymark - Filtered lookup over behavior and recipe guidance
#[derive(Parser)]
#[command(name = "waymark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "WAYMARK_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List document summaries
    Summary {
        /// Filter query, e.g. "type:behavior tier:must -tag:obsolete"
        #[arg(short, long)]
        filter: Option<String>,

        /// Reject unknown filter keys instead of ignoring them
        #[arg(long)]
        strict: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// List the ids of documents matching a filter
    Ids {
        /// Filter query
        #[arg(short, long)]
        filter: String,

        /// Reject unknown filter keys instead of ignoring them
        #[arg(long)]
        strict: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Show full documents
    Details {
        /// Document ids
        ids: Vec<String>,

        /// Select documents by filter instead of listing ids
        #[arg(short, long)]
        filter: Option<String>,

        /// Reject unknown filter keys instead of ignoring them
        #[arg(long)]
        strict: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Load every backend and report rejected documents
    Validate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::discover(cli.config.as_deref())?;

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .init();

    // Execute command
    match cli.command {
        Commands::Summary {
            filter,
            strict,
            output,
        } => commands::summary::run(config, filter.as_deref(), strict, output),
        Commands::Ids {
            filter,
            strict,
            output,
        } => commands::ids::run(config, &filter, strict, output),
        Commands::Details {
            ids,
            filter,
            strict,
            output,
        } => commands::details::run(config, ids, filter.as_deref(), strict, output),
        Commands::Validate => commands::validate::run(config),
    }
}
