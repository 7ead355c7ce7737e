//! HTTP transport seam.
//!
//! The fetch pipeline talks to the network through [`HttpClient`] so the
//! streaming loop can be driven by an in-memory client in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, header};
use url::Url;

use super::FetchFailure;

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
}

/// A response whose body has not been read yet.
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// URL after redirects.
    pub final_url: Url,
    /// Lowercased header names; repeated headers joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: Box<dyn BodyStream>,
}

impl HttpResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers.get("content-length").and_then(|v| v.trim().parse().ok())
    }
}

/// Incremental body reader. `Ok(None)` marks the end of the body.
#[async_trait]
pub trait BodyStream: Send {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, FetchFailure>;
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends the request and returns once the status line and headers arrive.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchFailure>;
}

/// [`HttpClient`] backed by reqwest with rustls.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    http: Client,
}

impl ReqwestClient {
    pub fn new(user_agent: &str, max_redirects: usize) -> Result<Self, FetchFailure> {
        let http = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchFailure::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchFailure> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchFailure::InvalidRequest(format!("invalid method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            final_url: response.url().clone(),
            headers: flatten_headers(response.headers()),
            body: Box::new(ReqwestBody(response)),
        })
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl BodyStream for ReqwestBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, FetchFailure> {
        Ok(self.0.chunk().await?)
    }
}

fn flatten_headers(headers: &header::HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_flatten_headers_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("Set-Cookie", HeaderValue::from_static("a=1"));
        headers.append("Set-Cookie", HeaderValue::from_static("b=2"));
        headers.insert("Content-Type", HeaderValue::from_static("text/html"));

        let flat = flatten_headers(&headers);
        assert_eq!(flat.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
        assert_eq!(flat.get("content-type").map(String::as_str), Some("text/html"));
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::new("webstash/0.1", 5).is_ok());
    }
}
