//! Resume ledger: the latest completed year per domain.
//!
//! The ledger is persisted as `resume_ledger.json` and updated atomically each
//! time a (source, year) finishes. On start it is merged with a best-effort
//! reconstruction from the human-readable text sink, so output written before
//! the JSON ledger existed still counts as completed work.

use crate::domains::url_host;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

static URL_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^url:\s*(?P<url>.*?)\s*$").unwrap());
static YEAR_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^year:\s*(?P<year>\d+)\s*$").unwrap());

/// One domain's resume point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub year: u16,
    /// When the year was marked complete; `None` for reconstructed entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Domain to latest completed year.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Ledger {
    domains: BTreeMap<String, LedgerEntry>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Ledger {
    /// Load the JSON ledger at `ledger_path` and merge in the text sink.
    ///
    /// Missing or unreadable files never fail the load; each source simply
    /// contributes nothing.
    #[instrument(level = "info", skip_all, fields(ledger = %ledger_path.display(), text = %text_sink.display()))]
    pub fn load(ledger_path: &Path, text_sink: &Path) -> Self {
        let mut ledger = match read_json(ledger_path) {
            Ok(Some(ledger)) => ledger,
            Ok(None) => Ledger::default(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable resume ledger");
                Ledger::default()
            }
        };
        ledger.path = Some(ledger_path.to_path_buf());

        for (domain, year) in last_processed_years(text_sink) {
            ledger.merge(domain, year, None);
        }

        info!(domains = ledger.domains.len(), "Resume ledger ready");
        ledger
    }

    /// Latest completed year for `domain`.
    pub fn last_year(&self, domain: &str) -> Option<u16> {
        self.domains.get(domain).map(|e| e.year)
    }

    /// Whether `year` for `domain` was already completed by an earlier run.
    pub fn is_done(&self, domain: &str, year: u16) -> bool {
        self.last_year(domain).is_some_and(|done| done >= year)
    }

    /// Record `year` as completed for `domain` and persist the ledger.
    ///
    /// Persistence failures are returned but leave the in-memory state updated.
    pub fn mark_done(&mut self, domain: &str, year: u16) -> Result<(), LedgerError> {
        self.merge(domain.to_string(), year, Some(Utc::now()));
        match &self.path {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    fn merge(&mut self, domain: String, year: u16, completed_at: Option<DateTime<Utc>>) {
        let entry = self.domains.entry(domain).or_insert(LedgerEntry { year, completed_at });
        if year > entry.year {
            *entry = LedgerEntry { year, completed_at };
        }
    }

    /// Write to a temp file next to `path`, then rename over it.
    fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "Persisted resume ledger");
        Ok(())
    }
}

fn read_json(path: &Path) -> Result<Option<Ledger>, LedgerError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Reconstruct domain to highest year from a text sink.
///
/// Each `---` line must be followed by `url: <url>` and `year: <year>`.
/// Blocks that do not fit are skipped. A missing file yields an empty map.
pub fn last_processed_years(text_sink: &Path) -> BTreeMap<String, u16> {
    match std::fs::read(text_sink) {
        Ok(bytes) => parse_text_sink(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %text_sink.display(), error = %e, "Cannot read text sink for resume");
            }
            BTreeMap::new()
        }
    }
}

/// Parse text-sink content into domain to highest year.
pub fn parse_text_sink(content: &str) -> BTreeMap<String, u16> {
    let lines: Vec<&str> = content.lines().collect();
    let mut years = BTreeMap::new();

    for (i, line) in lines.iter().enumerate() {
        if line.trim() != "---" {
            continue;
        }
        let (Some(url_line), Some(year_line)) = (lines.get(i + 1), lines.get(i + 2)) else {
            continue;
        };
        let Some(url) = URL_LINE.captures(url_line.trim()).map(|c| c["url"].to_string()) else {
            continue;
        };
        let Some(year) = YEAR_LINE
            .captures(year_line.trim())
            .and_then(|c| c["year"].parse::<u16>().ok())
        else {
            continue;
        };

        let latest = years.entry(url_host(&url)).or_insert(year);
        *latest = (*latest).max(year);
    }

    years
}
