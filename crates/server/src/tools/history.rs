//! search_history and fetch_history tools.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use webstash_client::FetchCache;
use webstash_core::{SearchCache, cache::HistoryQuery};

use crate::error::respond;

/// Parameters shared by the history tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    /// Case-insensitive filter on the query (searches) or URL (fetches).
    #[serde(default)]
    pub keyword: Option<String>,

    /// 1-based page number (default 1).
    #[serde(default = "default_page")]
    pub page: usize,

    /// Entries per page, 1-100 (default 10).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    10
}

impl From<HistoryParams> for HistoryQuery {
    fn from(params: HistoryParams) -> Self {
        HistoryQuery { keyword: params.keyword, page: params.page, limit: params.limit }
    }
}

pub fn search_history_impl(cache: &SearchCache, params: HistoryParams) -> Result<CallToolResult, McpError> {
    respond(cache.list_history(&params.into()))
}

pub fn fetch_history_impl(cache: &FetchCache, params: HistoryParams) -> Result<CallToolResult, McpError> {
    respond(cache.list_history(&params.into()))
}
