//! Client for the per-collection capture index.
//!
//! For each collection mapped to the requested year the client asks for every
//! capture under `<host>/*` with host-match semantics and line-delimited JSON
//! output. Transient failures back off exponentially (`base^attempt`) and are
//! retried up to the configured limit, after which the client moves on to the
//! next collection and reports it as failed.

use super::{Captures, IndexLookup};
use crate::config::Config;
use crate::error::IndexError;
use crate::models::IndexRecord;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Capture-index client shared by the whole run.
#[derive(Debug)]
pub struct IndexClient {
    http: Client,
    config: Arc<Config>,
    requests: AtomicUsize,
}

impl IndexClient {
    pub fn new(http: Client, config: Arc<Config>) -> Self {
        Self {
            http,
            config,
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of HTTP requests issued so far.
    pub fn requests_issued(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Query every collection for `year` and concatenate the captures.
    ///
    /// Returns no captures, without any request, when `year` has no
    /// collections configured. A collection that runs out of retries is
    /// skipped and counted as failed.
    #[instrument(level = "info", skip(self))]
    pub async fn query(&self, host: &str, year: u16) -> Captures {
        let collections = self.config.collections_for(year);
        if collections.is_empty() {
            debug!("No collections mapped for year; skipping");
            return Captures::default();
        }

        let mut captures = Captures::default();
        for collection in collections {
            match self.query_collection(host, year, collection).await {
                Ok(found) => {
                    debug!(%collection, count = found.len(), "Collection done");
                    captures.records.extend(found);
                }
                Err(e) => {
                    warn!(%host, year, %collection, error = %e, "Giving up on collection");
                    captures.failed_collections += 1;
                }
            }
        }

        info!(
            count = captures.records.len(),
            failed_collections = captures.failed_collections,
            "Index query finished"
        );
        captures
    }

    /// Records of one collection.
    ///
    /// A 404, a malformed line and repeated empty answers all count as an
    /// answer. Only a transient failure on the last attempt is returned.
    async fn query_collection(
        &self,
        host: &str,
        year: u16,
        collection: &str,
    ) -> Result<Vec<IndexRecord>, IndexError> {
        let retries = self.config.index_retries;

        for attempt in 1..=retries {
            match self.request(host, collection).await {
                Ok(body) => {
                    sleep(self.config.index_delay()).await;
                    match parse_index_lines(&body) {
                        Ok(records) if !records.is_empty() => return Ok(records),
                        Ok(_) => debug!(%collection, attempt, "Index answered with no records"),
                        Err(e) => {
                            warn!(%host, year, %collection, error = %e, "Discarding malformed index response");
                            return Ok(Vec::new());
                        }
                    }
                }
                Err(e) if !e.is_transient() => {
                    sleep(self.config.index_delay()).await;
                    debug!(%collection, error = %e, "Nothing to retry for collection");
                    return Ok(Vec::new());
                }
                Err(e) if attempt == retries => return Err(e),
                Err(e) => {
                    let backoff = self.config.backoff(attempt);
                    warn!(
                        %host,
                        year,
                        %collection,
                        attempt,
                        ?backoff,
                        error = %e,
                        "Index attempt failed; backing off"
                    );
                    sleep(backoff).await;
                }
            }
        }

        Ok(Vec::new())
    }

    /// One index request; returns the raw response body on success.
    async fn request(&self, host: &str, collection: &str) -> Result<String, IndexError> {
        let url = format!(
            "{}?url={}&matchType=host&output=json",
            self.config.index_url(collection),
            urlencoding::encode(&format!("{host}/*"))
        );
        self.requests.fetch_add(1, Ordering::Relaxed);

        let response = self
            .http
            .get(&url)
            .timeout(self.config.index_timeout())
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(IndexError::NotFound),
            status if !status.is_success() => Err(IndexError::Status(status)),
            _ => Ok(response.text().await?),
        }
    }
}

impl IndexLookup for IndexClient {
    async fn lookup(&self, host: &str, year: u16) -> Captures {
        self.query(host, year).await
    }
}

/// Parse a line-delimited JSON index response, ignoring blank lines.
///
/// # Errors
///
/// Fails on the first line that is not a valid capture record.
pub fn parse_index_lines(body: &str) -> Result<Vec<IndexRecord>, IndexError> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| IndexError::MalformedLine { line: i + 1, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client(config: Config) -> IndexClient {
        IndexClient::new(Client::new(), Arc::new(config))
    }

    fn line(url: &str) -> String {
        format!(r#"{{"url": "{url}", "filename": "crawl-data/x.warc.gz", "offset": "10", "length": "20"}}"#)
    }

    /// Serve `replies` as `(status, body)`, one connection each, recording request paths.
    async fn canned_index(replies: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let paths = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&paths);

        tokio::spawn(async move {
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
                seen.lock().unwrap().push(path);

                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/{{collection}}-index"), paths)
    }

    fn canned_client(endpoint: String) -> IndexClient {
        let mut collections = BTreeMap::new();
        collections.insert(2023, vec!["CC-A".to_string(), "CC-B".to_string()]);
        let http = Client::builder().pool_max_idle_per_host(0).build().unwrap();
        IndexClient::new(
            http,
            Arc::new(Config {
                index_endpoint: endpoint,
                collections,
                index_retries: 3,
                index_delay_ms: 0,
                backoff_unit_ms: 0,
                index_timeout_secs: 5,
                ..Config::default()
            }),
        )
    }

    fn urls(captures: &Captures) -> Vec<&str> {
        captures.records.iter().map(|r| r.url.as_str()).collect()
    }

    fn collections_hit(paths: &Mutex<Vec<String>>) -> Vec<String> {
        paths
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.split('?').next().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_records_follow_collection_order() {
        let body_a = format!("{}\n{}\n", line("https://example.com/a1"), line("https://example.com/a2"));
        let (endpoint, paths) = canned_index(vec![(200, body_a), (200, line("https://example.com/b1"))]).await;
        let client = canned_client(endpoint);

        let captures = client.query("example.com", 2023).await;
        assert_eq!(
            urls(&captures),
            vec!["https://example.com/a1", "https://example.com/a2", "https://example.com/b1"]
        );
        assert!(captures.is_complete());
        assert_eq!(client.requests_issued(), 2);
        assert_eq!(collections_hit(&paths), vec!["/CC-A-index", "/CC-B-index"]);
        assert!(paths.lock().unwrap()[0].ends_with("?url=example.com%2F%2A&matchType=host&output=json"));
    }

    #[tokio::test]
    async fn test_not_found_ends_collection_without_retry() {
        let (endpoint, paths) = canned_index(vec![
            (404, String::new()),
            (200, line("https://example.com/b1")),
        ])
        .await;
        let client = canned_client(endpoint);

        let captures = client.query("example.com", 2023).await;
        assert_eq!(urls(&captures), vec!["https://example.com/b1"]);
        assert!(captures.is_complete());
        assert_eq!(collections_hit(&paths), vec!["/CC-A-index", "/CC-B-index"]);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_success() {
        let (endpoint, paths) = canned_index(vec![
            (503, String::new()),
            (503, String::new()),
            (200, line("https://example.com/a1")),
            (200, line("https://example.com/b1")),
        ])
        .await;
        let client = canned_client(endpoint);

        let captures = client.query("example.com", 2023).await;
        assert_eq!(urls(&captures), vec!["https://example.com/a1", "https://example.com/b1"]);
        assert!(captures.is_complete());
        assert_eq!(
            collections_hit(&paths),
            vec!["/CC-A-index", "/CC-A-index", "/CC-A-index", "/CC-B-index"]
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_mark_collection_failed() {
        let (endpoint, _) = canned_index(vec![
            (500, String::new()),
            (502, String::new()),
            (503, String::new()),
            (200, line("https://example.com/b1")),
        ])
        .await;
        let client = canned_client(endpoint);

        let captures = client.query("example.com", 2023).await;
        assert_eq!(urls(&captures), vec!["https://example.com/b1"]);
        assert_eq!(captures.failed_collections, 1);
        assert_eq!(client.requests_issued(), 4);
    }

    #[tokio::test]
    async fn test_empty_answer_is_retried_up_to_limit() {
        let (endpoint, _) = canned_index(vec![
            (200, String::new()),
            (200, "\n".to_string()),
            (200, String::new()),
            (200, line("https://example.com/b1")),
        ])
        .await;
        let client = canned_client(endpoint);

        let captures = client.query("example.com", 2023).await;
        assert_eq!(urls(&captures), vec!["https://example.com/b1"]);
        assert!(captures.is_complete());
        assert_eq!(client.requests_issued(), 4);
    }

    #[tokio::test]
    async fn test_malformed_line_drops_only_that_collection() {
        let body_a = format!("{}\nnot json\n", line("https://example.com/a1"));
        let (endpoint, _) = canned_index(vec![(200, body_a), (200, line("https://example.com/b1"))]).await;
        let client = canned_client(endpoint);

        let captures = client.query("example.com", 2023).await;
        assert_eq!(urls(&captures), vec!["https://example.com/b1"]);
        assert!(captures.is_complete());
        assert_eq!(client.requests_issued(), 2);
    }

    #[tokio::test]
    async fn test_unmapped_year_issues_no_request() {
        let client = client(Config {
            index_endpoint: "http://127.0.0.1:9/{collection}".to_string(),
            ..Config::default()
        });

        let captures = client.query("example.com", 2021).await;
        assert_eq!(captures, Captures::default());
        assert!(captures.is_complete());
        assert_eq!(client.requests_issued(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_index_gives_up_after_retries() {
        let mut collections = BTreeMap::new();
        collections.insert(2023, vec!["CC-TEST-1".to_string(), "CC-TEST-2".to_string()]);
        let client = client(Config {
            index_endpoint: "http://127.0.0.1:9/{collection}-index".to_string(),
            collections,
            index_retries: 2,
            index_delay_ms: 0,
            backoff_unit_ms: 0,
            index_timeout_secs: 2,
            ..Config::default()
        });

        let captures = client.query("example.com", 2023).await;
        assert!(captures.records.is_empty());
        assert_eq!(captures.failed_collections, 2);
        assert!(!captures.is_complete());
        assert_eq!(client.requests_issued(), 4);
    }

    #[test]
    fn test_parse_index_lines() {
        let body = concat!(
            r#"{"url": "https://example.com/a", "filename": "f1.warc.gz", "offset": "1", "length": "10", "status": "200"}"#,
            "\n\n",
            r#"{"url": "https://example.com/b", "filename": "f2.warc.gz", "offset": "20", "length": "30"}"#,
            "\n"
        );
        let records = parse_index_lines(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, "https://example.com/a");
        assert_eq!(records[1].offset, 20);
    }

    #[test]
    fn test_parse_index_lines_reports_bad_line() {
        let body = "{\"url\": \"https://example.com/a\", \"filename\": \"f\", \"offset\": \"1\", \"length\": \"2\"}\nnot json\n";
        match parse_index_lines(body) {
            Err(IndexError::MalformedLine { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed line, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_index_lines("").unwrap().is_empty());
    }
}
