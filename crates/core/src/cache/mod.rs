//! Memory-resident caches for search results and fetched documents.
//!
//! This module provides:
//!
//! - A generic [`Store`] with LRU ordering, per-entry and global byte budgets
//!   and TTL expiry (lazy on read, periodic via [`spawn_sweeper`])
//! - The search record cache with its `resultId -> searchId` index
//! - Fetch record types shared with the fetch pipeline

pub mod fetch;
pub mod page;
pub mod recency;
pub mod search;
pub mod store;
pub mod sweep;

use std::time::Duration;

pub use crate::Error;

pub use fetch::{FetchRecord, FetchSnapshot, FetchStatus, ResponseHead};
pub use recency::RecencyList;
pub use page::{HistoryQuery, Pagination, paginate};
pub use search::{
    ResultPreview, SearchCache, SearchHistoryEntry, SearchHistoryPage, SearchItem, SearchRecord, SearchResultEntry,
    SearchSummary,
};
pub use store::{CacheRecord, NoIndex, SideIndex, Store, StoreStats};
pub use sweep::{Sweep, spawn_sweeper};

/// Maximum live records per store.
pub const MAX_ENTRIES: usize = 1000;

/// Lifetime of every cached record.
pub const RECORD_TTL: Duration = Duration::from_secs(60 * 60);

/// Interval between TTL sweeps of the fetch store.
pub const FETCH_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Interval between TTL sweeps of the search store.
pub const SEARCH_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Budgets and timings for one [`Store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLimits {
    /// Per-record cap on stored bytes.
    pub max_file_size: usize,
    /// Cap on the sum of stored bytes.
    pub max_total_size: usize,
    /// Cap on the number of live records.
    pub max_entries: usize,
    /// Time-to-live applied at record creation.
    pub ttl: Duration,
    /// Period of the background sweep.
    pub sweep_interval: Duration,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self::fetch(4 * 1024 * 1024, 100 * 1024 * 1024)
    }
}

impl StoreLimits {
    pub fn fetch(max_file_size: usize, max_total_size: usize) -> Self {
        Self {
            max_file_size,
            max_total_size,
            max_entries: MAX_ENTRIES,
            ttl: RECORD_TTL,
            sweep_interval: FETCH_SWEEP_INTERVAL,
        }
    }

    pub fn search(max_file_size: usize, max_total_size: usize) -> Self {
        Self { sweep_interval: SEARCH_SWEEP_INTERVAL, ..Self::fetch(max_file_size, max_total_size) }
    }

    /// Expiry instant for a record created at `created_at`.
    pub fn expiry_from(&self, created_at: chrono::DateTime<chrono::Utc>) -> chrono::DateTime<chrono::Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        created_at.checked_add_signed(ttl).unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_default_limits() {
        let limits = StoreLimits::default();
        assert_eq!(limits.max_file_size, 4 * 1024 * 1024);
        assert_eq!(limits.max_total_size, 100 * 1024 * 1024);
        assert_eq!(limits.max_entries, 1000);
        assert_eq!(limits.ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_expiry_from_adds_ttl() {
        let limits = StoreLimits::default();
        let now = Utc::now();
        assert_eq!(limits.expiry_from(now) - now, chrono::Duration::minutes(60));
    }
}
