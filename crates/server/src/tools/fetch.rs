//! fetch_url, fetch_raw_chunk and fetch_processed_view tools.

use std::collections::BTreeMap;
use std::time::Duration;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use webstash_client::cache::MAX_CHUNK_SIZE;
use webstash_client::fetch::{MAX_TIMEOUT, MIN_TIMEOUT};
use webstash_client::process::{
    DEFAULT_OUTPUT_SIZE, DEFAULT_RAW_PREVIEW_SIZE, DEFAULT_SUMMARY_CHARS, DEFAULT_SUMMARY_SENTENCES, MAX_OUTPUT_SIZE,
    grep::DEFAULT_MAX_MATCHES,
};
use webstash_client::{FetchCache, FetchParams, GrepOptions, ProcessingOptions};
use webstash_core::Error;

use crate::error::respond;

const MAX_SUMMARY_SENTENCES: usize = 50;
const MAX_SUMMARY_CHARS: usize = 10_000;
const MAX_GREP_MATCHES: usize = 1000;
const MAX_GREP_CONTEXT: usize = 100;

/// View options shared by fetch_url and fetch_processed_view.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingParams {
    /// Maximum characters of text returned in `data` (1-32768, default 8192).
    #[serde(default = "default_output_size")]
    pub output_size: usize,

    /// Convert HTML/JSON to plain text before returning it (default true).
    #[serde(default = "default_true")]
    pub extract_text: bool,

    /// Add an extractive summary (default false).
    #[serde(default)]
    pub summarize: bool,

    /// Sentences kept in the summary (default 5).
    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: usize,

    /// Character cap on the summary (default 500).
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,

    /// Search the text line by line.
    #[serde(default)]
    pub grep: Option<GrepParams>,

    /// Include the first bytes of the raw payload (default false).
    #[serde(default)]
    pub include_raw_preview: bool,

    /// Bytes in the raw preview (default 500).
    #[serde(default = "default_raw_preview_size")]
    pub raw_preview_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrepParams {
    /// Literal text, or a regex when `isRegex` is set.
    pub pattern: String,

    #[serde(default)]
    pub is_regex: bool,

    #[serde(default)]
    pub case_sensitive: bool,

    /// Lines of context before each match (overrides `context`).
    #[serde(default)]
    pub before: Option<usize>,

    /// Lines of context after each match (overrides `context`).
    #[serde(default)]
    pub after: Option<usize>,

    /// Lines of context on both sides (default 0).
    #[serde(default)]
    pub context: usize,

    /// Stop after this many matching lines (default 50).
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

fn default_output_size() -> usize {
    DEFAULT_OUTPUT_SIZE
}

fn default_true() -> bool {
    true
}

fn default_summary_sentences() -> usize {
    DEFAULT_SUMMARY_SENTENCES
}

fn default_summary_chars() -> usize {
    DEFAULT_SUMMARY_CHARS
}

fn default_raw_preview_size() -> usize {
    DEFAULT_RAW_PREVIEW_SIZE
}

fn default_max_matches() -> usize {
    DEFAULT_MAX_MATCHES
}

fn default_method() -> String {
    "GET".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_chunk_size() -> usize {
    8192
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            output_size: DEFAULT_OUTPUT_SIZE,
            extract_text: true,
            summarize: false,
            summary_sentences: DEFAULT_SUMMARY_SENTENCES,
            summary_chars: DEFAULT_SUMMARY_CHARS,
            grep: None,
            include_raw_preview: false,
            raw_preview_size: DEFAULT_RAW_PREVIEW_SIZE,
        }
    }
}

fn check_range(field: &str, value: usize, min: usize, max: usize) -> Result<(), Error> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("{field} must be between {min} and {max}")))
    }
}

impl ProcessingParams {
    /// Checks every bound and produces engine options.
    pub fn into_options(self) -> Result<ProcessingOptions, Error> {
        check_range("outputSize", self.output_size, 1, MAX_OUTPUT_SIZE)?;
        check_range("summarySentences", self.summary_sentences, 1, MAX_SUMMARY_SENTENCES)?;
        check_range("summaryChars", self.summary_chars, 1, MAX_SUMMARY_CHARS)?;
        check_range("rawPreviewSize", self.raw_preview_size, 1, MAX_CHUNK_SIZE)?;

        let grep = match self.grep {
            Some(grep) => {
                if grep.pattern.is_empty() {
                    return Err(Error::InvalidInput("grep.pattern cannot be empty".into()));
                }
                check_range("grep.maxMatches", grep.max_matches, 1, MAX_GREP_MATCHES)?;
                check_range("grep.context", grep.context, 0, MAX_GREP_CONTEXT)?;
                for (field, value) in [("grep.before", grep.before), ("grep.after", grep.after)] {
                    if let Some(value) = value {
                        check_range(field, value, 0, MAX_GREP_CONTEXT)?;
                    }
                }
                Some(GrepOptions {
                    pattern: grep.pattern,
                    is_regex: grep.is_regex,
                    case_sensitive: grep.case_sensitive,
                    before: grep.before,
                    after: grep.after,
                    context: grep.context,
                    max_matches: grep.max_matches,
                })
            }
            None => None,
        };

        Ok(ProcessingOptions {
            output_size: self.output_size,
            extract_text: self.extract_text,
            summarize: self.summarize,
            summary_sentences: self.summary_sentences,
            summary_chars: self.summary_chars,
            grep,
            include_raw_preview: self.include_raw_preview,
            raw_preview_size: self.raw_preview_size,
        })
    }
}

/// Parameters for the fetch_url tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchUrlParams {
    /// The URL to fetch. `https://` is assumed when no scheme is given.
    pub url: String,

    /// HTTP method (default GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    /// Overall deadline in milliseconds (100-600000, default 30000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Return the response headers.
    #[serde(default)]
    pub include_headers: bool,

    #[serde(flatten)]
    pub processing: ProcessingParams,
}

/// Parameters for the fetch_raw_chunk tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawChunkParams {
    /// Identifier returned by fetch_url.
    pub request_id: String,

    /// Byte offset into the stored payload (default 0).
    #[serde(default)]
    pub start_position: usize,

    /// Bytes to read (1-1048576, default 8192).
    #[serde(default = "default_chunk_size")]
    pub size: usize,

    /// Return the response headers.
    #[serde(default)]
    pub include_headers: bool,
}

/// Parameters for the fetch_processed_view tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedViewParams {
    /// Identifier returned by fetch_url.
    pub request_id: String,

    /// Return the response headers.
    #[serde(default)]
    pub include_headers: bool,

    #[serde(flatten)]
    pub processing: ProcessingParams,
}

pub async fn fetch_url_impl(cache: &FetchCache, params: FetchUrlParams) -> Result<CallToolResult, McpError> {
    let timeout = Duration::from_millis(params.timeout_ms);
    if timeout < MIN_TIMEOUT || timeout > MAX_TIMEOUT {
        return Err(Error::InvalidInput(format!(
            "timeoutMs must be between {} and {}",
            MIN_TIMEOUT.as_millis(),
            MAX_TIMEOUT.as_millis()
        ))
        .into());
    }
    let processing = params.processing.into_options()?;

    let request = FetchParams {
        url: params.url,
        method: params.method,
        headers: params.headers.unwrap_or_default(),
        timeout,
        include_headers: params.include_headers,
        processing,
    };
    respond(cache.fetch_and_cache(request).await)
}

pub fn raw_chunk_impl(cache: &FetchCache, params: RawChunkParams) -> Result<CallToolResult, McpError> {
    check_range("size", params.size, 1, MAX_CHUNK_SIZE)?;

    let chunk = cache
        .get_raw_chunk(&params.request_id, params.start_position, params.size, params.include_headers)
        .ok_or_else(|| Error::NotFound(format!("fetch {} not found or expired", params.request_id)));
    respond(chunk)
}

pub fn processed_view_impl(cache: &FetchCache, params: ProcessedViewParams) -> Result<CallToolResult, McpError> {
    let options = params.processing.into_options()?;

    let view = cache
        .get_processed_view(&params.request_id, &options, params.include_headers)
        .ok_or_else(|| Error::NotFound(format!("fetch {} not found or expired", params.request_id)));
    respond(view)
}
