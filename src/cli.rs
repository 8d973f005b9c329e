//! Command-line interface definitions.
//!
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for a sampling run.
///
/// # Examples
///
/// ```sh
/// # Defaults from the built-in configuration
/// ccsample -s sources.csv -k keywords.txt -o ./ccrawl_results
///
/// # Custom configuration, two years, backups afterwards
/// ccsample -s sources.csv -k keywords.txt -c config.yaml --years 2023,2024 --backup
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// CSV file with `name,state,city,URL` columns
    #[arg(short, long, env = "CCSAMPLE_SOURCES")]
    pub sources: PathBuf,

    /// Keyword list, one keyword per line
    #[arg(short, long, env = "CCSAMPLE_KEYWORDS")]
    pub keywords: PathBuf,

    /// Directory for the text sink, CSV sink and resume ledger
    #[arg(short, long, env = "CCSAMPLE_OUTPUT_DIR", default_value = "ccrawl_results")]
    pub output_dir: PathBuf,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "CCSAMPLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Comma-separated years overriding the configured list
    #[arg(long, value_delimiter = ',')]
    pub years: Option<Vec<u16>>,

    /// Copy both sinks to backup files after the run
    #[arg(long)]
    pub backup: bool,
}
