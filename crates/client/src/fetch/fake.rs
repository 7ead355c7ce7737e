//! In-memory [`HttpClient`] for tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;
use url::Url;

use super::{BodyStream, FetchFailure, HttpClient, HttpRequest, HttpResponse};

/// Canned response served for every request.
#[derive(Clone, Default)]
pub struct FakeClient {
    pub status: u16,
    pub status_text: String,
    pub final_url: Option<Url>,
    pub headers: BTreeMap<String, String>,
    pub chunks: Vec<Bytes>,
    /// Sleep before every chunk.
    pub chunk_delay: Option<Duration>,
    /// Returned from `send` instead of a response.
    pub send_failure: Option<FetchFailure>,
    /// Returned once all chunks are consumed.
    pub body_failure: Option<FetchFailure>,
    /// Body reads block until notified.
    pub gate: Option<Arc<Notify>>,
    /// Chunks handed out so far.
    pub reads: Arc<AtomicUsize>,
}

impl FakeClient {
    pub fn ok(content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers,
            chunks: vec![body.into()],
            ..Default::default()
        }
    }

    /// Body split into `count` chunks of `size` bytes of `b'a'`.
    pub fn chunked(content_type: &str, size: usize, count: usize) -> Self {
        let mut client = Self::ok(content_type, Bytes::new());
        client.chunks = (0..count).map(|_| Bytes::from(vec![b'a'; size])).collect();
        client.headers.insert("content-length".to_string(), (size * count).to_string());
        client
    }

    pub fn with_status(mut self, status: u16, status_text: &str) -> Self {
        self.status = status;
        self.status_text = status_text.to_string();
        self
    }
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchFailure> {
        if let Some(failure) = &self.send_failure {
            return Err(failure.clone());
        }

        Ok(HttpResponse {
            status: self.status,
            status_text: self.status_text.clone(),
            final_url: self.final_url.clone().unwrap_or(request.url),
            headers: self.headers.clone(),
            body: Box::new(FakeBody {
                chunks: self.chunks.iter().cloned().collect(),
                delay: self.chunk_delay,
                failure: self.body_failure.clone(),
                gate: self.gate.clone(),
                reads: Arc::clone(&self.reads),
            }),
        })
    }
}

struct FakeBody {
    chunks: VecDeque<Bytes>,
    delay: Option<Duration>,
    failure: Option<FetchFailure>,
    gate: Option<Arc<Notify>>,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl BodyStream for FakeBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, FetchFailure> {
        if let Some(gate) = self.gate.take() {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.chunks.pop_front() {
            Some(chunk) => {
                self.reads.fetch_add(1, Ordering::SeqCst);
                Ok(Some(chunk))
            }
            None => match self.failure.take() {
                Some(failure) => Err(failure),
                None => Ok(None),
            },
        }
    }
}
