//! The sampling pipeline over sources × years × domain variants × captures.
//!
//! For every source and configured year the orchestrator:
//!
//! 1. skips the year when the resume ledger already covers it
//! 2. queries the index for each domain variant, in expander order
//! 3. drops captures whose URL matches no keyword, before any fetch
//! 4. fetches and extracts the remaining captures one at a time
//! 5. appends each article to the sinks and stops at the per-year cap
//!
//! A year that finishes (cap reached or captures exhausted) is recorded in the
//! ledger. An interrupted year, or one where an index collection could not be
//! reached, is redone from scratch on the next run.

use crate::archive::{ArticleFetcher, IndexLookup};
use crate::config::Config;
use crate::domains::{domain_variants, source_domain};
use crate::error::FetchError;
use crate::keywords::KeywordMatcher;
use crate::ledger::Ledger;
use crate::models::{MatchedArticle, Source};
use crate::outputs::ArticleSink;
use crate::utils::truncate_for_log;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: usize,
    /// Years skipped because the ledger already covered them.
    pub years_skipped: usize,
    pub index_queries: usize,
    /// Index collections that ran out of retries.
    pub index_failures: usize,
    pub records_considered: usize,
    pub keyword_hits: usize,
    pub fetch_failures: usize,
    pub articles_written: usize,
    /// Articles written per (source name, year).
    pub matches: BTreeMap<(String, u16), usize>,
}

/// How a single (source, year) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YearOutcome {
    /// All variants and captures were processed.
    Exhausted,
    CapReached,
    /// Some index collection never answered; the year is not marked complete.
    Incomplete,
    /// Writing to the sinks failed; the year is not marked complete.
    SinkFailed,
}

/// Drives the whole sampling run.
pub struct Orchestrator<I, F> {
    config: Arc<Config>,
    index: I,
    fetcher: F,
    matcher: KeywordMatcher,
    ledger: Ledger,
}

impl<I, F> Orchestrator<I, F>
where
    I: IndexLookup,
    F: ArticleFetcher,
{
    pub fn new(config: Arc<Config>, index: I, fetcher: F, matcher: KeywordMatcher, ledger: Ledger) -> Self {
        Self {
            config,
            index,
            fetcher,
            matcher,
            ledger,
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Process every source for every configured year.
    ///
    /// Never fails: per-record and per-collection problems are logged and
    /// skipped, so the summary is always returned.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn run<S: ArticleSink>(&mut self, sources: &[Source], sink: &mut S) -> RunSummary {
        let mut summary = RunSummary::default();
        let years = self.config.years.clone();

        for (i, source) in sources.iter().enumerate() {
            summary.sources += 1;
            let domain = source_domain(&source.url);
            info!(
                index = i + 1,
                total = sources.len(),
                source = %source.name,
                state = %source.state,
                city = %source.city,
                %domain,
                "Processing source"
            );

            for &year in &years {
                if self.ledger.is_done(&domain, year) {
                    info!(source = %source.name, %domain, year, "Year already completed; skipping");
                    summary.years_skipped += 1;
                    continue;
                }

                let (outcome, written) = self.process_year(source, &domain, year, sink, &mut summary).await;
                summary.matches.insert((source.name.clone(), year), written);
                info!(source = %source.name, year, written, ?outcome, "Year finished");

                match outcome {
                    YearOutcome::Exhausted | YearOutcome::CapReached => {
                        if let Err(e) = self.ledger.mark_done(&domain, year) {
                            warn!(%domain, year, error = %e, "Failed to persist resume ledger");
                        }
                    }
                    YearOutcome::Incomplete | YearOutcome::SinkFailed => {
                        warn!(source = %source.name, %domain, year, ?outcome, "Year left open for the next run");
                    }
                }
            }
        }

        summary
    }

    #[instrument(level = "info", skip(self, source, sink, summary), fields(source_name = %source.name))]
    async fn process_year<S: ArticleSink>(
        &self,
        source: &Source,
        domain: &str,
        year: u16,
        sink: &mut S,
        summary: &mut RunSummary,
    ) -> (YearOutcome, usize) {
        let cap = self.config.max_matches_per_source_per_year;
        let mut written = 0usize;
        let mut written_urls = HashSet::new();
        let mut complete = true;

        for host in domain_variants(domain) {
            let captures = self.index.lookup(&host, year).await;
            summary.index_queries += 1;
            summary.index_failures += captures.failed_collections;
            if !captures.is_complete() {
                warn!(%host, failed = captures.failed_collections, "Index lookup incomplete");
                complete = false;
            }
            debug!(%host, count = captures.records.len(), "Captures to filter");

            for record in captures.records {
                summary.records_considered += 1;

                let keywords = self.matcher.matches(&record.url);
                if keywords.is_empty() {
                    continue;
                }
                summary.keyword_hits += 1;
                if written_urls.contains(&record.url) {
                    debug!(url = %record.url, "URL already written for this year");
                    continue;
                }

                let text = match self.fetcher.fetch_article(&record).await {
                    Ok(text) => text,
                    Err(e @ FetchError::TooShort { .. }) => {
                        debug!(url = %record.url, error = %e, "No article in capture");
                        summary.fetch_failures += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!(url = %record.url, error = %e, "Capture fetch failed");
                        summary.fetch_failures += 1;
                        continue;
                    }
                };

                let article = MatchedArticle {
                    source_name: source.name.clone(),
                    url: record.url.clone(),
                    year,
                    keywords,
                    text,
                };
                if let Err(e) = sink.append(&article) {
                    error!(url = %article.url, error = %e, "Failed to write article; abandoning year");
                    return (YearOutcome::SinkFailed, written);
                }

                written += 1;
                summary.articles_written += 1;
                written_urls.insert(record.url);
                info!(
                    url = %article.url,
                    keywords = ?article.keywords,
                    preview = %truncate_for_log(&article.text, 80),
                    written,
                    cap,
                    "Article saved"
                );

                if written >= cap {
                    info!(cap, "Match cap reached");
                    return (YearOutcome::CapReached, written);
                }
            }
        }

        let outcome = if complete {
            YearOutcome::Exhausted
        } else {
            YearOutcome::Incomplete
        };
        (outcome, written)
    }
}
