//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use crate::tools::{
    FetchUrlParams, HistoryParams, ProcessedViewParams, RawChunkParams, SearchGetParams, SearchResultGetParams,
    SearchStoreParams, fetch, history, search, stats,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use webstash_client::FetchCache;
use webstash_core::SearchCache;

/// The main MCP server handler for webstash.
#[derive(Clone)]
pub struct WebstashServer {
    search: SearchCache,
    fetch: FetchCache,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WebstashServer {
    /// Create a new server handler over the two caches.
    pub fn new(search: SearchCache, fetch: FetchCache) -> Self {
        Self { search, fetch, tool_router: Self::tool_router() }
    }

    #[tool(description = "Cache a list of search results for a query. Returns a searchId and a resultId per result.")]
    async fn search_store(&self, params: Parameters<SearchStoreParams>) -> Result<CallToolResult, McpError> {
        search::store_impl(&self.search, params.0)
    }

    #[tool(description = "Get a cached search with all of its results by searchId.")]
    async fn search_get(&self, params: Parameters<SearchGetParams>) -> Result<CallToolResult, McpError> {
        search::get_impl(&self.search, params.0)
    }

    #[tool(description = "Get a single cached search result by resultId.")]
    async fn search_result_get(&self, params: Parameters<SearchResultGetParams>) -> Result<CallToolResult, McpError> {
        search::result_get_impl(&self.search, params.0)
    }

    #[tool(description = "List cached searches, newest first, with optional keyword filter and pagination.")]
    async fn search_history(&self, params: Parameters<HistoryParams>) -> Result<CallToolResult, McpError> {
        history::search_history_impl(&self.search, params.0)
    }

    /// Fetch a URL into the cache.
    ///
    /// The body is capped at the configured per-entry size; the stored bytes can
    /// be read back later with fetch_raw_chunk or re-processed with
    /// fetch_processed_view.
    #[tool(
        description = "Fetch a URL and cache the response. Returns a requestId and a text view (optionally summarized or grepped)."
    )]
    async fn fetch_url(&self, params: Parameters<FetchUrlParams>) -> Result<CallToolResult, McpError> {
        fetch::fetch_url_impl(&self.fetch, params.0).await
    }

    #[tool(description = "Read a byte range of a cached fetch response. `encoding` is utf8 when the range is valid UTF-8, otherwise base64.")]
    async fn fetch_raw_chunk(&self, params: Parameters<RawChunkParams>) -> Result<CallToolResult, McpError> {
        fetch::raw_chunk_impl(&self.fetch, params.0)
    }

    #[tool(description = "Re-process a cached fetch response with new view options. No network request is made.")]
    async fn fetch_processed_view(&self, params: Parameters<ProcessedViewParams>) -> Result<CallToolResult, McpError> {
        fetch::processed_view_impl(&self.fetch, params.0)
    }

    #[tool(description = "List cached fetches, newest first, with optional URL keyword filter and pagination.")]
    async fn fetch_history(&self, params: Parameters<HistoryParams>) -> Result<CallToolResult, McpError> {
        history::fetch_history_impl(&self.fetch, params.0)
    }

    #[tool(description = "Report entry counts, byte usage and limits of the search and fetch caches.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats::stats_impl(&self.search, &self.fetch)
    }
}

impl ServerHandler for WebstashServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "webstash".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Caches search results and fetched web pages in memory for one hour. Store searches with search_store, \
                 fetch pages with fetch_url, then read them back by id."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::static_cache;

    #[test]
    fn test_all_tools_are_routed() {
        let server = WebstashServer::new(SearchCache::default(), static_cache("text/plain", "x"));
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cache_stats",
                "fetch_history",
                "fetch_processed_view",
                "fetch_raw_chunk",
                "fetch_url",
                "search_get",
                "search_history",
                "search_result_get",
                "search_store",
            ]
        );
    }

    #[test]
    fn test_server_info() {
        let server = WebstashServer::new(SearchCache::default(), static_cache("text/plain", "x"));
        let info = server.get_info();
        assert_eq!(info.server_info.name, "webstash");
        assert!(info.capabilities.tools.is_some());
    }
}
