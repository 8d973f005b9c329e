//! Range-fetching single captures out of WARC container files.

use super::ArticleFetcher;
use crate::config::Config;
use crate::error::FetchError;
use crate::extract::extract_article_text;
use crate::models::IndexRecord;
use flate2::read::MultiGzDecoder;
use reqwest::Client;
use reqwest::header::RANGE;
use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, instrument};
use warc::{WarcHeader, WarcReader};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Fetches capture bytes from the archive storage host and extracts article text.
#[derive(Debug)]
pub struct RecordFetcher {
    http: Client,
    config: Arc<Config>,
}

impl RecordFetcher {
    pub fn new(http: Client, config: Arc<Config>) -> Self {
        Self { http, config }
    }

    /// Fetch one capture and return its article text.
    ///
    /// Issues a single ranged GET for `[offset, offset + length - 1]`; there
    /// is no retry. The text is returned only when it is longer than the
    /// configured minimum.
    ///
    /// # Errors
    ///
    /// Every failure is reported as a [`FetchError`] kind; callers treat all
    /// of them as "no article for this record".
    #[instrument(level = "info", skip_all, fields(url = %record.url))]
    pub async fn fetch_text(&self, record: &IndexRecord) -> Result<String, FetchError> {
        let range = record.byte_range().ok_or(FetchError::EmptyRange)?;
        let url = format!(
            "{}/{}",
            self.config.archive_host.trim_end_matches('/'),
            record.filename.trim_start_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .header(RANGE, range)
            .timeout(self.config.fetch_timeout())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "Fetched capture");

        let html = response_payload(&bytes)?;
        article_from_payload(&html, self.config.min_article_chars)
    }
}

impl ArticleFetcher for RecordFetcher {
    async fn fetch_article(&self, record: &IndexRecord) -> Result<String, FetchError> {
        self.fetch_text(record).await
    }
}

/// Run the extractor over a decoded payload and enforce the length floor.
pub fn article_from_payload(html: &str, min_chars: usize) -> Result<String, FetchError> {
    let text = extract_article_text(html, min_chars);
    let text = text.trim();
    let chars = text.chars().count();
    if chars > min_chars {
        Ok(text.to_string())
    } else {
        Err(FetchError::TooShort { chars })
    }
}

/// Decode the payload of the first `response` record in a container slice.
///
/// Gzip-compressed input (one or more members) is inflated first. The HTTP
/// status line and headers are stripped, a chunked or gzip-encoded body is
/// decoded, and the remaining bytes are decoded as UTF-8, replacing invalid
/// sequences.
pub fn response_payload(bytes: &[u8]) -> Result<String, FetchError> {
    let data = if bytes.starts_with(&GZIP_MAGIC) {
        inflate(bytes)?
    } else {
        bytes.to_vec()
    };

    for record in WarcReader::new(data.as_slice()).iter_records() {
        let record = record.map_err(|e| FetchError::MalformedContainer(e.to_string()))?;
        if record.header(WarcHeader::WarcType).as_deref() == Some("response") {
            let content = http_content(record.body())?;
            return Ok(String::from_utf8_lossy(&content).into_owned());
        }
    }

    Err(FetchError::NoResponseRecord)
}

fn inflate(bytes: &[u8]) -> Result<Vec<u8>, FetchError> {
    let mut inflated = Vec::new();
    MultiGzDecoder::new(bytes)
        .read_to_end(&mut inflated)
        .map_err(FetchError::Decompress)?;
    Ok(inflated)
}

/// Body of a captured HTTP response with its transfer and content coding undone.
///
/// Archives usually store bodies already decoded while keeping the original
/// headers, so each coding is only undone when the bytes are actually in it.
fn http_content(message: &[u8]) -> Result<Cow<'_, [u8]>, FetchError> {
    let (head, body) = split_http(message);
    let head = String::from_utf8_lossy(head);
    let mut content = Cow::Borrowed(body);

    if header_has(&head, "transfer-encoding", "chunked") {
        match dechunk(&content) {
            Some(joined) => content = Cow::Owned(joined),
            None => debug!("Body is not chunked despite its header; keeping it as stored"),
        }
    }
    if header_has(&head, "content-encoding", "gzip") && content.starts_with(&GZIP_MAGIC) {
        content = Cow::Owned(inflate(&content)?);
    }

    Ok(content)
}

/// Split a captured response message into its head and body.
fn split_http(message: &[u8]) -> (&[u8], &[u8]) {
    [b"\r\n\r\n".as_slice(), b"\n\n".as_slice()]
        .iter()
        .find_map(|sep| {
            message
                .windows(sep.len())
                .position(|w| w == *sep)
                .map(|pos| (&message[..pos], &message[pos + sep.len()..]))
        })
        .unwrap_or((&message[..0], message))
}

/// Whether header `name` lists `token` among its comma-separated values.
fn header_has(head: &str, name: &str, token: &str) -> bool {
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .flat_map(|(_, value)| value.split(','))
        .any(|value| value.trim().eq_ignore_ascii_case(token))
}

/// Join the chunks of a chunked body; `None` when it is not chunked.
///
/// A body cut off mid-chunk keeps what arrived.
fn dechunk(body: &[u8]) -> Option<Vec<u8>> {
    let mut joined = Vec::new();
    let mut rest = body;

    while !rest.is_empty() {
        let end = rest.windows(2).position(|w| w == b"\r\n")?;
        let size = std::str::from_utf8(&rest[..end]).ok()?;
        let size = usize::from_str_radix(size.split(';').next()?.trim(), 16).ok()?;
        rest = &rest[end + 2..];
        if size == 0 {
            break;
        }
        let take = size.min(rest.len());
        joined.extend_from_slice(&rest[..take]);
        rest = &rest[take..];
        rest = rest.strip_prefix(b"\r\n".as_slice()).unwrap_or(rest);
    }

    Some(joined)
}
