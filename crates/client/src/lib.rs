//! Fetch side of webstash.
//!
//! This crate provides the streaming fetch pipeline, content processing, and
//! the fetch cache service used by the server.

pub mod cache;
pub mod fetch;
pub mod process;

pub use cache::{ChunkEncoding, FetchCache, FetchHistoryEntry, FetchHistoryPage, FetchParams, FetchResult, RawChunk};
pub use fetch::{FetchFailure, Fetcher, HttpClient, ReqwestClient, canonicalize};
pub use process::{ContentKind, GrepOptions, ProcessingOptions, detect_kind};
