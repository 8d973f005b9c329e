//! Run configuration.
//!
//! Every tunable of the pipeline lives in [`Config`]. Values come from an
//! optional YAML file; anything the file omits keeps its default. A
//! `collections` entry replaces the whole default year table.
//!
//! ```yaml
//! max_matches_per_source_per_year: 40
//! years: [2023, 2024]
//! index_delay_ms: 2000
//! collections:
//!   2022: ["CC-MAIN-2022-49"]
//! ```

use crate::error::ConfigError;
use crate::extract::MIN_ARTICLE_CHARS;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// The ten crawls published in 2024, in release order.
const COLLECTIONS_2024: [&str; 10] = [
    "CC-MAIN-2024-10",
    "CC-MAIN-2024-18",
    "CC-MAIN-2024-22",
    "CC-MAIN-2024-26",
    "CC-MAIN-2024-30",
    "CC-MAIN-2024-33",
    "CC-MAIN-2024-38",
    "CC-MAIN-2024-42",
    "CC-MAIN-2024-46",
    "CC-MAIN-2024-51",
];

/// Placeholder substituted into [`Config::index_endpoint`].
pub const COLLECTION_PLACEHOLDER: &str = "{collection}";

/// All tunables for one run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stop a (source, year) once this many articles were written.
    pub max_matches_per_source_per_year: usize,
    /// Years to process, in the given order.
    pub years: Vec<u16>,
    /// Year to ordered collection identifiers. Unmapped years are skipped.
    pub collections: BTreeMap<u16, Vec<String>>,
    /// Index endpoint template containing `{collection}`.
    pub index_endpoint: String,
    /// Base URL of the archive storage host.
    pub archive_host: String,
    /// Attempts per collection before moving on.
    pub index_retries: u32,
    /// Courtesy pause after every successful index query.
    pub index_delay_ms: u64,
    /// Backoff after failed attempt `n` is `backoff_unit_ms * backoff_base^n`.
    pub backoff_base: u32,
    pub backoff_unit_ms: u64,
    pub index_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Extracted text must be strictly longer than this to count as an article.
    pub min_article_chars: usize,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(
            2024,
            COLLECTIONS_2024.iter().map(|c| c.to_string()).collect(),
        );
        for (year, collection) in [
            (2018, "CC-MAIN-2017-51"),
            (2019, "CC-MAIN-2018-51"),
            (2020, "CC-MAIN-2019-51"),
            (2023, "CC-MAIN-2023-14"),
        ] {
            collections.insert(year, vec![collection.to_string()]);
        }

        Self {
            max_matches_per_source_per_year: 80,
            years: vec![2024],
            collections,
            index_endpoint: "https://index.commoncrawl.org/{collection}-index".to_string(),
            archive_host: "https://data.commoncrawl.org".to_string(),
            index_retries: 3,
            index_delay_ms: 4000,
            backoff_base: 3,
            backoff_unit_ms: 1000,
            index_timeout_secs: 60,
            fetch_timeout_secs: 20,
            min_article_chars: MIN_ARTICLE_CHARS,
            user_agent: concat!("ccsample/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load a YAML config file, or defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or when
    /// the resulting values fail [`Config::validate`].
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let shown = path.display().to_string();
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: shown.clone(),
                    source,
                })?;
                let config: Config = serde_yaml::from_str(&raw).map_err(|source| {
                    ConfigError::Yaml {
                        path: shown.clone(),
                        source,
                    }
                })?;
                info!(path = %shown, "Loaded configuration file");
                config
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_matches_per_source_per_year == 0 {
            return Err(ConfigError::Invalid(
                "max_matches_per_source_per_year must be at least 1".to_string(),
            ));
        }
        if self.index_retries == 0 {
            return Err(ConfigError::Invalid("index_retries must be at least 1".to_string()));
        }
        if self.years.is_empty() {
            return Err(ConfigError::Invalid("years must not be empty".to_string()));
        }
        if !self.index_endpoint.contains(COLLECTION_PLACEHOLDER) {
            return Err(ConfigError::Invalid(format!(
                "index_endpoint must contain {COLLECTION_PLACEHOLDER}"
            )));
        }
        Ok(())
    }

    /// Ordered collections for `year`; empty when the year is unmapped.
    pub fn collections_for(&self, year: u16) -> &[String] {
        self.collections
            .get(&year)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Index endpoint URL for one collection.
    pub fn index_url(&self, collection: &str) -> String {
        self.index_endpoint
            .replace(COLLECTION_PLACEHOLDER, collection)
    }

    /// Sleep before retry `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_base).saturating_pow(attempt);
        Duration::from_millis(self.backoff_unit_ms.saturating_mul(factor))
    }

    pub fn index_delay(&self) -> Duration {
        Duration::from_millis(self.index_delay_ms)
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
