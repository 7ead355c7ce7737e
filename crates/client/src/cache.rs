//! Fetch cache service.
//!
//! Ties the [`Fetcher`] to a fetch [`Store`]: every fetch gets a record the
//! moment it starts, the transfer fills it in place, and later calls read raw
//! byte ranges or re-process the stored payload without touching the network.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;
use webstash_core::cache::{
    FetchRecord, FetchStatus, HistoryQuery, Pagination, Store, StoreLimits, StoreStats, paginate, spawn_sweeper,
};
use webstash_core::{AppConfig, Error, ErrorKind};

use crate::fetch::{DEFAULT_TIMEOUT, FetchOutcome, Fetcher, HttpClient, HttpRequest, ReqwestClient, canonicalize};
use crate::process::{GrepMatch, ProcessingOptions, detect_kind, process};

/// Largest raw chunk a single read may return.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// One fetch request.
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
    pub include_headers: bool,
    pub processing: ProcessingOptions,
}

impl FetchParams {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            include_headers: false,
            processing: ProcessingOptions::default(),
        }
    }
}

/// Processed view of a fetch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    pub request_id: String,
    /// Upstream HTTP status, absent when no response arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub status_text: String,
    pub fetch_status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Size announced by the upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_size: Option<u64>,
    /// Bytes actually stored.
    pub actual_size: usize,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_size: Option<usize>,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<GrepMatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_preview: Option<String>,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// Record metadata returned alongside a raw chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub fetch_status: FetchStatus,
    pub method: String,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// How `RawChunk::data` is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkEncoding {
    /// The slice is valid UTF-8 and is carried as-is.
    Utf8,
    /// Standard base64 with padding.
    Base64,
}

/// A byte range of a stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChunk {
    pub request_id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Total stored bytes.
    pub content_size: usize,
    pub start_position: usize,
    pub data_size: usize,
    pub encoding: ChunkEncoding,
    /// The slice, as text or base64 per `encoding`. Decoding it yields exactly
    /// `data_size` bytes.
    pub data: String,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<BTreeMap<String, String>>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchHistoryEntry {
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub fetch_status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub fetched_size: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchHistoryPage {
    pub fetches: Vec<FetchHistoryEntry>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// Memory-resident cache of fetched documents.
#[derive(Clone)]
pub struct FetchCache {
    store: Arc<Store<Arc<FetchRecord>>>,
    fetcher: Fetcher,
}

impl FetchCache {
    pub fn new(limits: StoreLimits, http: Arc<dyn HttpClient>) -> Self {
        let fetcher = Fetcher::new(http, limits.max_file_size);
        Self { store: Arc::new(Store::new("fetch", limits)), fetcher }
    }

    /// Builds the cache with a reqwest transport configured from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let http = ReqwestClient::new(&config.user_agent, config.max_redirects)
            .map_err(|e| Error::Internal(e.to_string()))?;
        Ok(Self::new(config.fetch_limits(), Arc::new(http)))
    }

    /// Fetches `params.url` into a new record and returns its processed view.
    ///
    /// Only malformed input is returned as `Err`; network and upstream HTTP
    /// failures end up on the record and in the returned view.
    pub async fn fetch_and_cache(&self, params: FetchParams) -> Result<FetchResult, Error> {
        let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = validate_method(&params.method)?;

        let request_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let record = Arc::new(FetchRecord::new(
            request_id.clone(),
            url.to_string(),
            method.clone(),
            params.headers.clone(),
            created_at,
            self.store.limits().expiry_from(created_at),
        ));
        self.store.insert(request_id.clone(), Arc::clone(&record), 0)?;

        let request = HttpRequest { method, url, headers: params.headers };
        let outcome = self.fetcher.fetch_into(&record, request, params.timeout).await;

        if let Err(e) = self.store.settle(&request_id, record.fetched_size()) {
            warn!(request_id = %request_id, error = %e, "could not account fetched bytes");
        }
        finalize(&record, &outcome);

        let (status, fetch_status, bytes) = record.read(|state| (state.http_status, state.status, state.fetched_size()));
        info!(
            request_id = %request_id,
            url = %record.url,
            status = ?status,
            fetch_status = ?fetch_status,
            bytes,
            truncated = outcome.truncated,
            elapsed_ms = outcome.elapsed_ms,
            "fetched url"
        );

        Ok(render(&record, &params.processing, params.include_headers))
    }

    /// Reads `size` bytes starting at `start` from a stored payload.
    ///
    /// A range that splits a multi-byte character or covers binary data comes
    /// back base64-encoded, so concatenating decoded chunks rebuilds the body.
    pub fn get_raw_chunk(&self, request_id: &str, start: usize, size: usize, include_headers: bool) -> Option<RawChunk> {
        let record = self.store.get(request_id)?;

        let chunk = record.read(|state| {
            let total = state.data.len();
            let begin = start.min(total);
            let end = start.saturating_add(size).min(total);
            let slice = &state.data[begin..end];
            let (encoding, data) = encode_chunk(slice);

            RawChunk {
                request_id: record.request_id.clone(),
                url: record.url.clone(),
                http_status: state.http_status,
                content_size: total,
                start_position: start,
                data_size: slice.len(),
                encoding,
                data,
                has_more: end < total,
                response_headers: include_headers.then(|| state.response_headers.clone()),
                metadata: ChunkMetadata {
                    fetch_status: state.status,
                    method: record.method.clone(),
                    status_text: state.status_text.clone(),
                    content_type: state.content_type.clone(),
                    expected_size: state.expected_size,
                    final_url: state.final_url.clone(),
                    created_at: record.created_at,
                    expires_at: record.expires_at,
                },
            }
        });
        Some(chunk)
    }

    /// Re-processes a stored payload with new options.
    pub fn get_processed_view(
        &self, request_id: &str, options: &ProcessingOptions, include_headers: bool,
    ) -> Option<FetchResult> {
        let record = self.store.get(request_id)?;
        Some(render(&record, options, include_headers))
    }

    /// Lists live fetches newest first, in-progress ones included.
    pub fn list_history(&self, query: &HistoryQuery) -> Result<FetchHistoryPage, Error> {
        query.validate()?;

        let mut records: Vec<Arc<FetchRecord>> =
            self.store.live().into_iter().filter(|record| query.matches(&record.url)).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.request_id.cmp(&a.request_id)));

        let (page, pagination) = paginate(records, query);
        let fetches = page
            .iter()
            .map(|record| {
                record.read(|state| FetchHistoryEntry {
                    request_id: record.request_id.clone(),
                    url: record.url.clone(),
                    method: record.method.clone(),
                    fetch_status: state.status,
                    http_status: state.http_status,
                    content_type: state.content_type.clone(),
                    fetched_size: state.data.len(),
                    created_at: record.created_at,
                    expires_at: record.expires_at,
                })
            })
            .collect();

        Ok(FetchHistoryPage { fetches, pagination })
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Runs the periodic TTL sweep on a background task.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.spawn_sweeper_every(self.store.limits().sweep_interval)
    }

    pub fn spawn_sweeper_every(&self, interval: Duration) -> JoinHandle<()> {
        spawn_sweeper(Arc::clone(&self.store), interval)
    }
}

fn validate_method(method: &str) -> Result<String, Error> {
    let method = method.trim().to_ascii_uppercase();
    let is_token = !method.is_empty()
        && method
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
    if !is_token {
        return Err(Error::InvalidInput(format!("invalid HTTP method: {method:?}")));
    }
    Ok(method)
}

fn encode_chunk(slice: &[u8]) -> (ChunkEncoding, String) {
    match std::str::from_utf8(slice) {
        Ok(text) => (ChunkEncoding::Utf8, text.to_string()),
        Err(_) => (ChunkEncoding::Base64, STANDARD.encode(slice)),
    }
}

/// Moves the record to its terminal state.
fn finalize(record: &FetchRecord, outcome: &FetchOutcome) {
    if let Some(failure) = &outcome.failure {
        record.fail(&Error::from(failure));
        return;
    }

    let (http_status, status_text) = record.read(|state| (state.http_status, state.status_text.clone()));
    match http_status {
        Some(code) if (200..300).contains(&code) => record.complete(),
        Some(code) => record.fail(&Error::UpstreamHttp { status: code, message: status_text }),
        None => record.fail(&Error::Internal("no response received".to_string())),
    }
}

fn render(record: &FetchRecord, options: &ProcessingOptions, include_headers: bool) -> FetchResult {
    record.read(|state| {
        let kind = detect_kind(state.content_type.as_deref());
        let view = process(&state.data, kind, options);

        FetchResult {
            request_id: record.request_id.clone(),
            status: state.http_status,
            status_text: state.status_text.clone(),
            fetch_status: state.status,
            content_type: state.content_type.clone(),
            content_size: state.expected_size,
            actual_size: state.data.len(),
            processed: view.processed,
            text_size: view.text_size,
            data: view.data,
            summary: view.summary,
            matches: view.matches,
            raw_preview: view.raw_preview,
            is_complete: view.is_complete,
            response_headers: include_headers.then(|| state.response_headers.clone()),
            error: state.error.clone(),
            error_code: state.error_code.clone(),
            error_kind: state.error_kind,
        }
    })
}
