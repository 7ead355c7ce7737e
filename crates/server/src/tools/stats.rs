//! cache_stats tool.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use webstash_client::FetchCache;
use webstash_core::{SearchCache, cache::StoreStats};

use crate::error::json_success;

/// Output of the cache_stats tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsOutput {
    pub search: StoreStats,
    pub fetch: StoreStats,
}

pub fn stats_impl(search: &SearchCache, fetch: &FetchCache) -> Result<CallToolResult, McpError> {
    json_success(&CacheStatsOutput { search: search.stats(), fetch: fetch.stats() })
}
