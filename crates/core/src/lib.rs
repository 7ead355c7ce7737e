//! Core types and shared functionality for webstash.
//!
//! This crate provides:
//! - The generic memory-resident cache engine and the search cache
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod text;

pub use cache::{SearchCache, Store, StoreLimits};
pub use config::AppConfig;
pub use error::{Error, ErrorKind, ErrorPayload};
