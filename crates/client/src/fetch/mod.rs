//! Streaming fetch pipeline.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Transfer
//! - Body bytes are appended to the cache record as they arrive, so readers
//!   see partial payloads while the transfer runs
//! - Reading stops at the per-record byte cap; the rest of the body is never
//!   pulled from the connection
//! - One deadline covers connect, headers and body
//! - A final URL on a different host adds a warning to the status text

pub mod error;
pub mod http;
pub mod url;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use webstash_core::cache::{FetchRecord, ResponseHead};

use crate::process::{ContentKind, detect_kind};

pub use error::FetchFailure;
pub use http::{BodyStream, HttpClient, HttpRequest, HttpResponse, ReqwestClient};
pub use self::url::{UrlError, canonicalize};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);
pub const MAX_TIMEOUT: Duration = Duration::from_millis(600_000);

/// What happened during one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub kind: ContentKind,
    /// Bytes appended to the record.
    pub received: usize,
    /// The body was cut at the byte cap.
    pub truncated: bool,
    /// Host of the final URL when it differs from the requested one.
    pub redirected_to: Option<String>,
    pub elapsed_ms: u64,
    pub failure: Option<FetchFailure>,
}

#[derive(Debug, Default)]
struct Transfer {
    kind: Option<ContentKind>,
    received: usize,
    truncated: bool,
    redirected_to: Option<String>,
}

/// Streams responses into fetch records.
#[derive(Clone)]
pub struct Fetcher {
    http: Arc<dyn HttpClient>,
    max_file_size: usize,
}

impl Fetcher {
    pub fn new(http: Arc<dyn HttpClient>, max_file_size: usize) -> Self {
        Self { http, max_file_size }
    }

    /// Runs `request` and fills `record` in place.
    ///
    /// Never changes the record's lifecycle status; the caller decides the
    /// terminal state from the returned outcome and the recorded HTTP status.
    pub async fn fetch_into(&self, record: &FetchRecord, request: HttpRequest, timeout: Duration) -> FetchOutcome {
        let start = Instant::now();
        let mut transfer = Transfer::default();

        let failure = match tokio::time::timeout(timeout, self.stream(record, request, &mut transfer)).await {
            Ok(Ok(())) => None,
            Ok(Err(failure)) => Some(failure),
            Err(_) => Some(FetchFailure::Timeout { after_ms: Some(timeout.as_millis() as u64) }),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if let Some(failure) = &failure {
            warn!(url = %record.url, error = %failure, elapsed_ms, "fetch failed");
        } else {
            debug!(url = %record.url, bytes = transfer.received, truncated = transfer.truncated, elapsed_ms, "fetch finished");
        }

        FetchOutcome {
            kind: transfer.kind.unwrap_or(ContentKind::Binary),
            received: transfer.received,
            truncated: transfer.truncated,
            redirected_to: transfer.redirected_to,
            elapsed_ms,
            failure,
        }
    }

    async fn stream(
        &self, record: &FetchRecord, request: HttpRequest, transfer: &mut Transfer,
    ) -> Result<(), FetchFailure> {
        let requested_host = request.url.host_str().map(str::to_string);
        let mut response = self.http.send(request).await?;

        let final_host = response.final_url.host_str().map(str::to_string);
        transfer.kind = Some(detect_kind(response.content_type()));

        record.record_head(ResponseHead {
            http_status: response.status,
            status_text: response.status_text.clone(),
            content_type: response.content_type().map(str::to_string),
            expected_size: response.content_length(),
            final_url: Some(response.final_url.to_string()),
            headers: response.headers.clone(),
        });

        if final_host != requested_host {
            let host = final_host.unwrap_or_default();
            record.append_status_note(&format!(" (warning: redirected to {host})"));
            transfer.redirected_to = Some(host);
        }

        while let Some(chunk) = response.body.next_chunk().await? {
            let remaining = self.max_file_size - transfer.received;
            if chunk.len() > remaining {
                record.append(&chunk[..remaining]);
                transfer.received += remaining;
                transfer.truncated = true;
                debug!(url = %record.url, limit = self.max_file_size, "body truncated at byte cap");
                break;
            }
            record.append(&chunk);
            transfer.received += chunk.len();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fake::FakeClient;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::atomic::Ordering;
    use webstash_core::cache::{FetchSnapshot, FetchStatus};

    fn record(url: &str) -> FetchRecord {
        let now = Utc::now();
        FetchRecord::new(
            "req".into(),
            url.into(),
            "GET".into(),
            BTreeMap::new(),
            now,
            now + chrono::Duration::hours(1),
        )
    }

    fn request(url: &str) -> HttpRequest {
        HttpRequest { method: "GET".into(), url: url.parse().unwrap(), headers: BTreeMap::new() }
    }

    #[tokio::test]
    async fn test_streams_whole_body() {
        let fetcher = Fetcher::new(Arc::new(FakeClient::chunked("text/plain", 1024, 4)), 1 << 20);
        let record = record("https://example.com/");

        let outcome = fetcher.fetch_into(&record, request("https://example.com/"), DEFAULT_TIMEOUT).await;

        assert!(outcome.failure.is_none());
        assert!(!outcome.truncated);
        assert_eq!(outcome.kind, ContentKind::Text);
        assert_eq!(outcome.received, 4096);

        let snapshot = record.read(FetchSnapshot::clone);
        assert_eq!(snapshot.fetched_size(), 4096);
        assert_eq!(snapshot.http_status, Some(200));
        assert_eq!(snapshot.expected_size, Some(4096));
        assert_eq!(snapshot.status, FetchStatus::InProgress);
    }

    #[tokio::test]
    async fn test_truncates_and_stops_reading() {
        let client = FakeClient::chunked("application/octet-stream", 1 << 20, 10);
        let reads = Arc::clone(&client.reads);
        let fetcher = Fetcher::new(Arc::new(client), 4 << 20);
        let record = record("https://example.com/big");

        let outcome = fetcher.fetch_into(&record, request("https://example.com/big"), DEFAULT_TIMEOUT).await;

        assert!(outcome.truncated);
        assert!(outcome.failure.is_none());
        assert_eq!(record.fetched_size(), 4 << 20);
        assert_eq!(record.read(|state| state.expected_size), Some(10 << 20));
        assert_eq!(reads.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_truncates_inside_a_chunk() {
        let fetcher = Fetcher::new(Arc::new(FakeClient::chunked("text/plain", 6, 2)), 8);
        let record = record("https://example.com/");

        let outcome = fetcher.fetch_into(&record, request("https://example.com/"), DEFAULT_TIMEOUT).await;

        assert!(outcome.truncated);
        assert_eq!(record.fetched_size(), 8);
    }

    #[tokio::test]
    async fn test_deadline_keeps_partial_body() {
        let mut client = FakeClient::chunked("text/plain", 10, 50);
        client.chunk_delay = Some(Duration::from_millis(20));
        let fetcher = Fetcher::new(Arc::new(client), 1 << 20);
        let record = record("https://example.com/slow");

        let outcome = fetcher
            .fetch_into(&record, request("https://example.com/slow"), Duration::from_millis(150))
            .await;

        assert_eq!(outcome.failure, Some(FetchFailure::Timeout { after_ms: Some(150) }));
        assert_eq!(outcome.failure.and_then(|f| f.error_code()).as_deref(), Some("ETIMEDOUT"));
        let fetched = record.fetched_size();
        assert!(fetched > 0 && fetched < 500, "fetched {fetched}");
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let client = FakeClient {
            send_failure: Some(FetchFailure::Network {
                message: "connection refused".into(),
                code: Some("ECONNREFUSED".into()),
                cause_code: None,
            }),
            ..Default::default()
        };
        let fetcher = Fetcher::new(Arc::new(client), 1024);
        let record = record("https://down.example/");

        let outcome = fetcher.fetch_into(&record, request("https://down.example/"), DEFAULT_TIMEOUT).await;

        assert_eq!(outcome.failure.and_then(|f| f.error_code()).as_deref(), Some("ECONNREFUSED"));
        assert_eq!(outcome.kind, ContentKind::Binary);
        assert!(record.read(|state| state.http_status.is_none()));
    }

    #[tokio::test]
    async fn test_cross_host_redirect_adds_warning() {
        let mut client = FakeClient::ok("text/html", "<p>moved</p>");
        client.final_url = Some("https://other.example/landing".parse().unwrap());
        let fetcher = Fetcher::new(Arc::new(client), 1024);
        let record = record("https://example.com/");

        let outcome = fetcher.fetch_into(&record, request("https://example.com/"), DEFAULT_TIMEOUT).await;

        assert_eq!(outcome.redirected_to.as_deref(), Some("other.example"));
        let snapshot = record.read(FetchSnapshot::clone);
        assert_eq!(snapshot.status_text, "OK (warning: redirected to other.example)");
        assert_eq!(snapshot.final_url.as_deref(), Some("https://other.example/landing"));
    }

    #[tokio::test]
    async fn test_same_host_redirect_is_silent() {
        let mut client = FakeClient::ok("text/html", "<p>moved</p>");
        client.final_url = Some("https://example.com/new".parse().unwrap());
        let fetcher = Fetcher::new(Arc::new(client), 1024);
        let record = record("https://example.com/old");

        let outcome = fetcher.fetch_into(&record, request("https://example.com/old"), DEFAULT_TIMEOUT).await;

        assert!(outcome.redirected_to.is_none());
        assert_eq!(record.read(|state| state.status_text.clone()), "OK");
    }
}
