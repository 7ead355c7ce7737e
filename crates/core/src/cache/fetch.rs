//! Fetch record types.
//!
//! A `FetchRecord` is inserted into the fetch store before the first byte
//! arrives and is then filled in place by the fetch pipeline. Identity fields
//! are fixed at creation; everything the transfer produces sits behind the
//! record's own lock, so appending never holds the store lock.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::CacheRecord;
use crate::error::{Error, ErrorKind};

/// Lifecycle of a fetch. `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    InProgress,
    Completed,
    Error,
}

impl FetchStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FetchStatus::InProgress)
    }
}

/// Mutable part of a fetch record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSnapshot {
    pub status: FetchStatus,
    pub http_status: Option<u16>,
    pub status_text: String,
    pub content_type: Option<String>,
    /// From the Content-Length header, if the upstream sent one.
    pub expected_size: Option<u64>,
    pub final_url: Option<String>,
    pub response_headers: BTreeMap<String, String>,
    pub data: Vec<u8>,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl FetchSnapshot {
    fn new() -> Self {
        Self {
            status: FetchStatus::InProgress,
            http_status: None,
            status_text: String::new(),
            content_type: None,
            expected_size: None,
            final_url: None,
            response_headers: BTreeMap::new(),
            data: Vec::new(),
            error: None,
            error_code: None,
            error_kind: None,
            completed_at: None,
        }
    }

    /// Bytes actually stored.
    pub fn fetched_size(&self) -> usize {
        self.data.len()
    }
}

/// Response metadata known once headers arrive.
#[derive(Debug, Clone, Default)]
pub struct ResponseHead {
    pub http_status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub expected_size: Option<u64>,
    pub final_url: Option<String>,
    pub headers: BTreeMap<String, String>,
}

/// A cached URL fetch.
#[derive(Debug)]
pub struct FetchRecord {
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub request_headers: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    state: Mutex<FetchSnapshot>,
}

impl CacheRecord for Arc<FetchRecord> {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl FetchRecord {
    /// A fresh `InProgress` record with no payload.
    pub fn new(
        request_id: String, url: String, method: String, request_headers: BTreeMap<String, String>,
        created_at: DateTime<Utc>, expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id,
            url,
            method,
            request_headers,
            created_at,
            expires_at,
            state: Mutex::new(FetchSnapshot::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FetchSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` over the current state without copying the payload.
    ///
    /// The record lock is held for the duration of `f`, so appends to this
    /// record wait until it returns.
    pub fn read<R>(&self, f: impl FnOnce(&FetchSnapshot) -> R) -> R {
        f(&self.lock())
    }

    pub fn fetched_size(&self) -> usize {
        self.lock().data.len()
    }

    /// Records the upstream status line and headers.
    pub fn record_head(&self, head: ResponseHead) {
        let mut state = self.lock();
        state.http_status = Some(head.http_status);
        state.status_text = head.status_text;
        state.content_type = head.content_type;
        state.expected_size = head.expected_size;
        state.final_url = head.final_url;
        state.response_headers = head.headers;
    }

    /// Appends body bytes. Ignored once the record is terminal.
    pub fn append(&self, chunk: &[u8]) {
        let mut state = self.lock();
        if !state.status.is_terminal() {
            state.data.extend_from_slice(chunk);
        }
    }

    /// Adds an advisory suffix to the status text.
    pub fn append_status_note(&self, note: &str) {
        self.lock().status_text.push_str(note);
    }

    /// Moves the record to `Completed`.
    pub fn complete(&self) {
        let mut state = self.lock();
        if state.status.is_terminal() {
            return;
        }
        state.status = FetchStatus::Completed;
        state.completed_at = Some(Utc::now());
    }

    /// Moves the record to `Error`, keeping the failure's kind and code.
    pub fn fail(&self, err: &Error) {
        let mut state = self.lock();
        if state.status.is_terminal() {
            return;
        }
        state.status = FetchStatus::Error;
        state.error = Some(err.message());
        state.error_code = err.transport_code();
        state.error_kind = Some(err.kind());
        state.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FetchRecord {
        let now = Utc::now();
        FetchRecord::new(
            "req-1".into(),
            "https://example.com".into(),
            "GET".into(),
            BTreeMap::new(),
            now,
            now + chrono::Duration::minutes(60),
        )
    }

    #[test]
    fn test_new_record_is_in_progress() {
        let record = record();
        let snapshot = record.read(FetchSnapshot::clone);
        assert_eq!(snapshot.status, FetchStatus::InProgress);
        assert_eq!(snapshot.fetched_size(), 0);
        assert!(snapshot.http_status.is_none());
    }

    #[test]
    fn test_append_then_complete() {
        let record = record();
        record.record_head(ResponseHead { http_status: 200, status_text: "OK".into(), ..Default::default() });
        record.append(b"hello ");
        record.append(b"world");
        record.complete();

        let snapshot = record.read(FetchSnapshot::clone);
        assert_eq!(snapshot.status, FetchStatus::Completed);
        assert_eq!(snapshot.data, b"hello world");
        assert_eq!(snapshot.http_status, Some(200));
        assert!(snapshot.completed_at.is_some());
    }

    #[test]
    fn test_terminal_state_is_final() {
        let record = record();
        record.fail(&Error::UpstreamHttp { status: 500, message: "Internal Server Error".into() });
        record.complete();
        record.append(b"late");

        let snapshot = record.read(FetchSnapshot::clone);
        assert_eq!(snapshot.status, FetchStatus::Error);
        assert!(snapshot.data.is_empty());
        assert_eq!(snapshot.error.as_deref(), Some("HTTP 500: Internal Server Error"));
        assert_eq!(snapshot.error_kind, Some(ErrorKind::UpstreamHttp));
        assert_eq!(snapshot.error_code, None);
    }

    #[test]
    fn test_failure_keeps_kind_and_code() {
        let record = record();
        record.append(b"partial");
        record.fail(&Error::Timeout("request timed out after 150ms".into()));

        record.read(|state| {
            assert_eq!(state.error_kind, Some(ErrorKind::Timeout));
            assert_eq!(state.error_code.as_deref(), Some("ETIMEDOUT"));
            assert_eq!(state.error.as_deref(), Some("request timed out after 150ms"));
            assert_eq!(state.data, b"partial");
        });
    }

    #[test]
    fn test_status_note_is_appended() {
        let record = record();
        record.record_head(ResponseHead { http_status: 200, status_text: "OK".into(), ..Default::default() });
        record.append_status_note(" (warning: redirected to other.example)");
        assert_eq!(record.read(|state| state.status_text.clone()), "OK (warning: redirected to other.example)");
    }

    #[test]
    fn test_read_borrows_payload_in_place() {
        let record = record();
        record.append(b"abcdef");
        assert_eq!(record.read(|state| state.data[2..4].to_vec()), b"cd");
    }
}
