//! Access to the web archive: the capture index and the WARC storage host.
//!
//! Retrieval happens in two steps:
//!
//! 1. **Index lookup** ([`index`]): ask each collection's index which captures
//!    exist for a hostname.
//! 2. **Record fetch** ([`record`]): range-fetch one capture out of its
//!    container file and extract the article text.
//!
//! The pipeline talks to both through the [`IndexLookup`] and
//! [`ArticleFetcher`] traits so it can run against in-memory fakes.

use crate::error::FetchError;
use crate::models::IndexRecord;

pub mod index;
pub mod record;

pub use index::IndexClient;
pub use record::RecordFetcher;

/// Captures found for one hostname and year.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Captures {
    /// Records from every collection that answered, in collection order.
    pub records: Vec<IndexRecord>,
    /// Collections that ran out of retries without an answer.
    pub failed_collections: usize,
}

impl Captures {
    /// Whether every collection answered, so the record list is the full set.
    pub fn is_complete(&self) -> bool {
        self.failed_collections == 0
    }
}

/// Something that lists archive captures for a hostname in a given year.
pub trait IndexLookup {
    /// All captures under `host` for `year`, in collection order.
    ///
    /// Collection failures never abort the lookup; they are counted in
    /// [`Captures::failed_collections`] so callers can tell an outage apart
    /// from an empty answer.
    async fn lookup(&self, host: &str, year: u16) -> Captures;
}

/// Something that turns one capture into extracted article text.
pub trait ArticleFetcher {
    async fn fetch_article(&self, record: &IndexRecord) -> Result<String, FetchError>;
}
