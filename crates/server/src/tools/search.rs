//! search_store, search_get and search_result_get tools.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use webstash_core::{
    Error, SearchCache,
    cache::{SearchItem, SearchRecord},
};

use crate::error::respond;

/// Parameters for the search_store tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchStoreParams {
    /// The query the results were produced for.
    pub query: String,

    /// Result items. Each carries `title`, `link` (or `url`) and `snippet`
    /// (or `description`); other fields are kept as-is.
    pub results: Vec<SearchItem>,
}

/// Parameters for the search_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchGetParams {
    /// Identifier returned by search_store.
    pub search_id: String,
}

/// Parameters for the search_result_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultGetParams {
    /// Identifier of a single result.
    pub result_id: String,
}

pub fn store_impl(cache: &SearchCache, params: SearchStoreParams) -> Result<CallToolResult, McpError> {
    if params.query.trim().is_empty() {
        return Err(Error::InvalidInput("query cannot be empty".into()).into());
    }
    respond(cache.store(params.query.trim(), params.results))
}

pub fn get_impl(cache: &SearchCache, params: SearchGetParams) -> Result<CallToolResult, McpError> {
    let record = cache
        .get_by_search_id(&params.search_id)
        .map(|record| SearchRecord::clone(&record))
        .ok_or_else(|| Error::NotFound(format!("search {} not found or expired", params.search_id)));
    respond(record)
}

pub fn result_get_impl(cache: &SearchCache, params: SearchResultGetParams) -> Result<CallToolResult, McpError> {
    let entry = cache
        .get_by_result_id(&params.result_id)
        .ok_or_else(|| Error::NotFound(format!("result {} not found or expired", params.result_id)));
    respond(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::output_json;
    use serde_json::json;

    fn items() -> Vec<SearchItem> {
        serde_json::from_value(json!([
            {"title": "Cats", "url": "https://cats.example", "description": "All about cats", "rank": 1},
            {"title": "More cats", "link": "https://more.example", "snippet": "x".repeat(150)}
        ]))
        .unwrap()
    }

    #[test]
    fn test_store_then_get() {
        let cache = SearchCache::default();
        let stored =
            store_impl(&cache, SearchStoreParams { query: "cats".into(), results: items() }).unwrap();
        let summary = output_json(&stored);

        assert_eq!(summary["resultCount"], 2);
        assert_eq!(summary["results"][1]["snippet"].as_str().map(str::len), Some(103));

        let search_id = summary["searchId"].as_str().unwrap().to_string();
        let record = output_json(&get_impl(&cache, SearchGetParams { search_id }).unwrap());
        assert_eq!(record["query"], "cats");
        assert_eq!(record["results"][0]["link"], "https://cats.example");
        assert_eq!(record["results"][0]["raw"]["rank"], 1);

        let result_id = summary["results"][0]["resultId"].as_str().unwrap().to_string();
        let entry = output_json(&result_get_impl(&cache, SearchResultGetParams { result_id }).unwrap());
        assert_eq!(entry["title"], "Cats");
    }

    #[test]
    fn test_unknown_ids_are_error_results() {
        let cache = SearchCache::default();

        let result = get_impl(&cache, SearchGetParams { search_id: "missing".into() }).unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(output_json(&result)["code"], "NOT_FOUND");

        let result = result_get_impl(&cache, SearchResultGetParams { result_id: "missing".into() }).unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn test_empty_query_is_invalid_params() {
        let cache = SearchCache::default();
        let err = store_impl(&cache, SearchStoreParams { query: "  ".into(), results: vec![] }).unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
