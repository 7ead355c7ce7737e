//! Content processing for fetched payloads.
//!
//! Pure functions over stored bytes: classify by content type, flatten to
//! text, summarize, and grep. Nothing here touches the network or a cache.

pub mod grep;
pub mod summary;
pub mod text;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use webstash_core::text::prefix_chars;

pub use grep::{GrepMatch, GrepOptions, MatchRange, grep_like};
pub use summary::summarize;
pub use text::to_text;

pub const DEFAULT_OUTPUT_SIZE: usize = 8192;
pub const MAX_OUTPUT_SIZE: usize = 32768;
pub const DEFAULT_SUMMARY_SENTENCES: usize = 5;
pub const DEFAULT_SUMMARY_CHARS: usize = 500;
pub const DEFAULT_RAW_PREVIEW_SIZE: usize = 500;

/// Coarse classification of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Html,
    Json,
    Xml,
    Text,
    Binary,
}

/// Classifies a Content-Type header value.
///
/// Checked in order html, json, xml, any other `text/*`; everything else,
/// including a missing header, is binary.
pub fn detect_kind(content_type: Option<&str>) -> ContentKind {
    let Some(content_type) = content_type else {
        return ContentKind::Binary;
    };
    let lowered = content_type.to_ascii_lowercase();

    if lowered.contains("html") {
        ContentKind::Html
    } else if lowered.contains("json") {
        ContentKind::Json
    } else if lowered.contains("xml") {
        ContentKind::Xml
    } else if lowered.trim_start().starts_with("text/") {
        ContentKind::Text
    } else {
        ContentKind::Binary
    }
}

/// How a stored payload is turned into a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    /// Character cap on `data`.
    pub output_size: usize,
    pub extract_text: bool,
    pub summarize: bool,
    pub summary_sentences: usize,
    pub summary_chars: usize,
    pub grep: Option<GrepOptions>,
    pub include_raw_preview: bool,
    /// Byte cap on the raw preview.
    pub raw_preview_size: usize,
}

impl Default for ProcessingOptions {
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

/// Result of running [`process`] over a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedContent {
    /// True when text extraction produced a non-empty result.
    pub processed: bool,
    /// Length in characters of the extracted text.
    pub text_size: Option<usize>,
    pub data: String,
    /// True when `data` holds the whole source text.
    pub is_complete: bool,
    pub summary: Option<String>,
    pub matches: Option<Vec<GrepMatch>>,
    pub raw_preview: Option<String>,
}

/// Builds a view over `raw` according to `options`.
pub fn process(raw: &[u8], kind: ContentKind, options: &ProcessingOptions) -> ProcessedContent {
    let extracted = if options.extract_text { to_text(raw, kind) } else { String::new() };
    let processed = !extracted.is_empty();

    let source: Cow<'_, str> = if processed {
        Cow::Owned(extracted)
    } else if kind == ContentKind::Binary {
        Cow::Borrowed("")
    } else {
        String::from_utf8_lossy(raw)
    };

    let data = prefix_chars(&source, options.output_size).to_string();
    let is_complete = data.len() == source.len();

    let summary = options
        .summarize
        .then(|| summarize(&source, options.summary_sentences, options.summary_chars));
    let matches = options.grep.as_ref().map(|grep| grep_like(&source, grep));
    let raw_preview = options
        .include_raw_preview
        .then(|| String::from_utf8_lossy(&raw[..raw.len().min(options.raw_preview_size)]).into_owned());

    ProcessedContent {
        processed,
        text_size: processed.then(|| source.chars().count()),
        data,
        is_complete,
        summary,
        matches,
        raw_preview,
    }
}
