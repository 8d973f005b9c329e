//! Typed errors for the pipeline stages.
//!
//! Each stage reports what kind of failure happened so the caller can decide
//! between retrying and skipping. None of these are fatal to a run.

use thiserror::Error;

/// Failure of a single archive-index request.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("index returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The index answers 404 when a pattern has no captures in a collection.
    #[error("no captures in collection")]
    NotFound,

    #[error("malformed index line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl IndexError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, IndexError::Transport(_) | IndexError::Status(_))
    }
}

/// Failure to turn one index record into article text.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("archive request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("archive returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("record has an empty byte range")]
    EmptyRange,

    #[error("gzip decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("malformed WARC container: {0}")]
    MalformedContainer(String),

    #[error("no response record in container")]
    NoResponseRecord,

    #[error("extracted text too short ({chars} chars)")]
    TooShort { chars: usize },
}

/// Failure to load or validate the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure to read or persist the resume ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger json: {0}")]
    Json(#[from] serde_json::Error),
}
