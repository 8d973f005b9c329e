//! Data models shared across the sampling pipeline.
//!
//! - [`Source`]: one named outlet from the source list
//! - [`IndexRecord`]: one capture returned by the archive index
//! - [`MatchedArticle`]: an extracted article ready to be written to the sinks

use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;

/// A named news source from the source list.
///
/// Sources are loaded once before the run and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Source {
    /// Display name, written to the CSV sink.
    pub name: String,
    pub state: String,
    pub city: String,
    /// Root URL of the outlet, e.g. `https://www.example.com`.
    #[serde(rename = "URL")]
    pub url: String,
}

/// A single capture returned by the archive index.
///
/// The index emits `offset` and `length` as JSON strings, so both are parsed
/// leniently. Every other field of the index line is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexRecord {
    /// The captured page URL.
    pub url: String,
    /// Path of the container file on the archive storage host.
    pub filename: String,
    /// Byte offset of the record inside the container file.
    #[serde(deserialize_with = "number_or_string")]
    pub offset: u64,
    /// Compressed length of the record in bytes.
    #[serde(deserialize_with = "number_or_string")]
    pub length: u64,
}

impl IndexRecord {
    /// HTTP `Range` header value covering exactly this record.
    ///
    /// Returns `None` for a zero-length record, which has no valid range.
    pub fn byte_range(&self) -> Option<String> {
        if self.length == 0 {
            return None;
        }
        let end = self.offset.checked_add(self.length - 1)?;
        Some(format!("bytes={}-{}", self.offset, end))
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// An article that passed keyword filtering and text extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedArticle {
    pub source_name: String,
    pub url: String,
    pub year: u16,
    /// Distinct matched keywords, kept sorted so output is stable.
    pub keywords: BTreeSet<String>,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_record_from_index_line() {
        let line = r#"{"urlkey": "com,example)/news/budget", "timestamp": "20240301120000", "url": "https://example.com/news/budget", "mime": "text/html", "status": "200", "length": "5120", "offset": "1048576", "filename": "crawl-data/CC-MAIN-2024-10/segments/1/warc/CC-MAIN-1.warc.gz"}"#;
        let record: IndexRecord = serde_json::from_str(line).unwrap();

        assert_eq!(record.url, "https://example.com/news/budget");
        assert_eq!(record.offset, 1_048_576);
        assert_eq!(record.length, 5120);
        assert!(record.filename.ends_with(".warc.gz"));
    }

    #[test]
    fn test_index_record_accepts_numeric_fields() {
        let line = r#"{"url": "https://example.com/", "filename": "a.warc.gz", "offset": 10, "length": 20}"#;
        let record: IndexRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.offset, 10);
        assert_eq!(record.length, 20);
    }

    #[test]
    fn test_index_record_rejects_missing_filename() {
        let line = r#"{"url": "https://example.com/", "offset": "1", "length": "2"}"#;
        assert!(serde_json::from_str::<IndexRecord>(line).is_err());
    }

    #[test]
    fn test_byte_range_is_inclusive() {
        let record = IndexRecord {
            url: "https://example.com/".to_string(),
            filename: "a.warc.gz".to_string(),
            offset: 100,
            length: 50,
        };
        assert_eq!(record.byte_range().as_deref(), Some("bytes=100-149"));
    }

    #[test]
    fn test_byte_range_zero_length() {
        let record = IndexRecord {
            url: "https://example.com/".to_string(),
            filename: "a.warc.gz".to_string(),
            offset: 100,
            length: 0,
        };
        assert_eq!(record.byte_range(), None);
    }
}
