//! Search cache operations.
//!
//! Stores caller-supplied search results under a fresh `searchId`, with every
//! result reachable by its own `resultId` through a secondary index that lives
//! under the store lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::page::{HistoryQuery, Pagination, paginate};
use super::store::{CacheRecord, SideIndex, Store, StoreStats};
use super::{StoreLimits, spawn_sweeper};
use crate::Error;
use crate::text::truncate_chars;

/// Snippets in store summaries are cut to this many characters.
pub const SNIPPET_PREVIEW_CHARS: usize = 100;

/// One raw search item as handed over by the caller.
///
/// Any field besides `title`, `link` and `snippet` is kept verbatim in the
/// entry's raw payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "url")]
    pub link: String,
    #[serde(default, alias = "description")]
    pub snippet: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A cached search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultEntry {
    pub result_id: String,
    pub search_id: String,
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub raw: Value,
}

/// A cached search with all of its results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub search_id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub results: Vec<SearchResultEntry>,
    #[serde(skip)]
    sequence: u64,
}

impl CacheRecord for Arc<SearchRecord> {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Result as listed in a store summary, with a shortened snippet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultPreview {
    pub result_id: String,
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Returned by [`SearchCache::store`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchSummary {
    pub search_id: String,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub results: Vec<ResultPreview>,
}

/// One row of the search history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub search_id: String,
    pub query: String,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryPage {
    pub searches: Vec<SearchHistoryEntry>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// `resultId -> searchId`.
#[derive(Debug, Default)]
pub struct ResultIndex {
    owners: HashMap<String, String>,
}

impl SideIndex<Arc<SearchRecord>> for ResultIndex {
    fn on_insert(&mut self, key: &str, record: &Arc<SearchRecord>) {
        for entry in &record.results {
            self.owners.insert(entry.result_id.clone(), key.to_string());
        }
    }

    fn on_remove(&mut self, _key: &str, record: &Arc<SearchRecord>) {
        for entry in &record.results {
            self.owners.remove(&entry.result_id);
        }
    }

    fn lookup(&self, alias: &str) -> Option<String> {
        self.owners.get(alias).cloned()
    }

    fn forget(&mut self, alias: &str) {
        self.owners.remove(alias);
    }
}

/// Memory-resident cache of search results.
#[derive(Debug, Clone)]
pub struct SearchCache {
    store: Arc<Store<Arc<SearchRecord>, ResultIndex>>,
    sequence: Arc<AtomicU64>,
}

impl SearchCache {
    pub fn new(limits: StoreLimits) -> Self {
        Self { store: Arc::new(Store::new("search", limits)), sequence: Arc::new(AtomicU64::new(0)) }
    }

    /// Caches `items` under a new search id and returns a summary.
    ///
    /// Every item gets a fresh result id. Summary snippets are cut to 100
    /// characters; the stored entries keep the full text.
    pub fn store(&self, query: &str, items: Vec<SearchItem>) -> Result<SearchSummary, Error> {
        let search_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let expires_at = self.store.limits().expiry_from(created_at);

        let results: Vec<SearchResultEntry> = items
            .into_iter()
            .map(|item| {
                let raw = serde_json::to_value(&item).unwrap_or(Value::Null);
                SearchResultEntry {
                    result_id: Uuid::new_v4().to_string(),
                    search_id: search_id.clone(),
                    title: item.title,
                    link: item.link,
                    snippet: item.snippet,
                    raw,
                }
            })
            .collect();

        let record = SearchRecord {
            search_id: search_id.clone(),
            query: query.to_string(),
            created_at,
            expires_at,
            results,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };

        let size = serde_json::to_vec(&record)
            .map_err(|e| Error::Internal(format!("failed to size search record: {e}")))?
            .len();

        let summary = SearchSummary {
            search_id: search_id.clone(),
            result_count: record.results.len(),
            timestamp: created_at,
            expires_at,
            results: record
                .results
                .iter()
                .map(|entry| ResultPreview {
                    result_id: entry.result_id.clone(),
                    title: entry.title.clone(),
                    link: entry.link.clone(),
                    snippet: truncate_chars(&entry.snippet, SNIPPET_PREVIEW_CHARS),
                })
                .collect(),
        };

        self.store.insert(search_id, Arc::new(record), size)?;
        tracing::debug!(search_id = %summary.search_id, query, results = summary.result_count, size, "cached search");

        Ok(summary)
    }

    pub fn get_by_search_id(&self, search_id: &str) -> Option<Arc<SearchRecord>> {
        self.store.get(search_id)
    }

    /// Finds a single result through the `resultId` index.
    pub fn get_by_result_id(&self, result_id: &str) -> Option<SearchResultEntry> {
        let record = self.store.resolve(result_id)?;
        record.results.iter().find(|entry| entry.result_id == result_id).cloned()
    }

    /// Lists live searches newest first, filtered and paginated.
    pub fn list_history(&self, query: &HistoryQuery) -> Result<SearchHistoryPage, Error> {
        query.validate()?;

        let mut records: Vec<Arc<SearchRecord>> =
            self.store.live().into_iter().filter(|record| query.matches(&record.query)).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.sequence.cmp(&a.sequence)));

        let (page, pagination) = paginate(records, query);
        let searches = page
            .iter()
            .map(|record| SearchHistoryEntry {
                search_id: record.search_id.clone(),
                query: record.query.clone(),
                result_count: record.results.len(),
                timestamp: record.created_at,
                expires_at: record.expires_at,
            })
            .collect();

        Ok(SearchHistoryPage { searches, pagination })
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Runs the periodic TTL sweep on a background task.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.spawn_sweeper_every(self.store.limits().sweep_interval)
    }

    pub fn spawn_sweeper_every(&self, interval: Duration) -> JoinHandle<()> {
        spawn_sweeper(Arc::clone(&self.store), interval)
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(StoreLimits::search(4 * 1024 * 1024, 100 * 1024 * 1024))
    }
}
