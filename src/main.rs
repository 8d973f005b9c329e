//! # ccsample
//!
//! Samples a web archive for pages from a fixed list of news sources,
//! keeps only pages whose URL mentions one of the configured keywords,
//! extracts their article text and appends it to a text and a CSV sink.
//!
//! ## Usage
//!
//! ```sh
//! ccsample -s sources.csv -k keywords.txt -o ./ccrawl_results
//! ```
//!
//! ## Architecture
//!
//! The run is a single sequential pipeline:
//! 1. **Resume**: rebuild the latest completed year per domain
//! 2. **Indexing**: list archive captures for each domain variant
//! 3. **Filtering**: keep captures whose URL matches a keyword
//! 4. **Fetching**: range-fetch each capture and extract its article text
//! 5. **Output**: append and flush both sinks after every article
//!
//! The job can be killed at any point and rerun; completed (source, year)
//! pairs are skipped.

use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod archive;
mod cli;
mod config;
mod domains;
mod error;
mod extract;
mod keywords;
mod ledger;
mod models;
mod outputs;
mod pipeline;
mod sources;
mod utils;

use archive::{IndexClient, RecordFetcher};
use cli::Cli;
use config::Config;
use keywords::{KeywordMatcher, load_keywords};
use ledger::Ledger;
use outputs::{OutputPaths, OutputSinks, backup::backup_sinks};
use pipeline::Orchestrator;
use sources::load_sources;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ccsample starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(years) = args.years {
        config.years = years;
        config.validate()?;
    }
    info!(
        years = ?config.years,
        cap = config.max_matches_per_source_per_year,
        "Configuration ready"
    );

    ensure_writable_dir(&args.output_dir).await?;
    let paths = OutputPaths::in_dir(&args.output_dir);

    // ---- Inputs ----
    let keywords = load_keywords(&args.keywords)?;
    let matcher = KeywordMatcher::new(&keywords)?;
    info!(patterns = matcher.len(), "Keyword automaton compiled");
    if matcher.is_empty() {
        warn!("Keyword list is empty; no capture will be fetched");
    }
    let sources = load_sources(&args.sources)?;

    // ---- Resume state & sinks ----
    let ledger = Ledger::load(&paths.ledger, &paths.articles);
    let mut sinks = OutputSinks::open(&paths)?;

    // ---- Pipeline ----
    let config = Arc::new(config);
    let http = Client::builder().user_agent(config.user_agent.as_str()).build()?;
    let index = IndexClient::new(http.clone(), Arc::clone(&config));
    let fetcher = RecordFetcher::new(http, Arc::clone(&config));
    let mut orchestrator = Orchestrator::new(Arc::clone(&config), index, fetcher, matcher, ledger);

    let summary = orchestrator.run(&sources, &mut sinks).await;
    info!(
        sources = summary.sources,
        years_skipped = summary.years_skipped,
        index_queries = summary.index_queries,
        index_requests = orchestrator.index().requests_issued(),
        index_failures = summary.index_failures,
        records = summary.records_considered,
        keyword_hits = summary.keyword_hits,
        fetch_failures = summary.fetch_failures,
        articles = summary.articles_written,
        ledger_domains = orchestrator.ledger().len(),
        "Run complete"
    );
    for ((source, year), count) in &summary.matches {
        debug!(%source, year, count, "Matches per source and year");
    }

    if args.backup {
        backup_sinks(&paths).await;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
