//! Generic cache engine.
//!
//! A `Store` owns a record map, a recency list, a running byte counter and an
//! optional side index, all behind one mutex. Callers only see atomic
//! operations, so the size, count and expiry invariants hold no matter how the
//! store is used.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::recency::RecencyList;
use super::StoreLimits;
use crate::Error;

/// A record that can live in a [`Store`].
pub trait CacheRecord: Clone + Send + Sync + 'static {
    /// Instant after which the record is no longer observable.
    fn expires_at(&self) -> DateTime<Utc>;

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}

/// Secondary mapping kept consistent with the store's primary map.
///
/// Hooks run while the store lock is held, so a record and its index entries
/// appear and disappear together.
pub trait SideIndex<T>: Default + Send + 'static {
    fn on_insert(&mut self, key: &str, record: &T);

    fn on_remove(&mut self, key: &str, record: &T);

    /// Map an alias to a primary key.
    fn lookup(&self, alias: &str) -> Option<String>;

    /// Drop an alias whose target is gone.
    fn forget(&mut self, alias: &str);
}

/// Side index that tracks nothing.
#[derive(Debug, Default)]
pub struct NoIndex;

impl<T> SideIndex<T> for NoIndex {
    fn on_insert(&mut self, _key: &str, _record: &T) {}

    fn on_remove(&mut self, _key: &str, _record: &T) {}

    fn lookup(&self, _alias: &str) -> Option<String> {
        None
    }

    fn forget(&mut self, _alias: &str) {}
}

/// Point-in-time counters for a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub entries: usize,
    pub total_bytes: usize,
    pub max_entries: usize,
    pub max_total_size: usize,
    pub max_file_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug)]
struct Slot<T> {
    record: T,
    size: usize,
}

#[derive(Debug)]
struct StoreState<T, X> {
    entries: HashMap<String, Slot<T>>,
    recency: RecencyList,
    total_bytes: usize,
    index: X,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<T: CacheRecord, X: SideIndex<T>> StoreState<T, X> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyList::new(),
            total_bytes: 0,
            index: X::default(),
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    fn remove_key(&mut self, key: &str) -> Option<Slot<T>> {
        self.recency.remove(key);
        let slot = self.entries.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(slot.size);
        self.index.on_remove(key, &slot.record);
        Some(slot)
    }

    fn evict_for_budget(&mut self, incoming: usize, max_total: usize, protect: Option<&str>) -> usize {
        let mut evicted = 0;
        while self.total_bytes + incoming > max_total {
            let victim = match protect {
                Some(keep) => self.recency.oldest_except(keep),
                None => self.recency.oldest(),
            };
            let Some(victim) = victim.map(str::to_string) else {
                break;
            };
            self.remove_key(&victim);
            evicted += 1;
        }
        self.evictions += evicted as u64;
        evicted
    }

    fn evict_for_count(&mut self, max_entries: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > max_entries {
            let Some(victim) = self.recency.oldest().map(str::to_string) else {
                break;
            };
            self.remove_key(&victim);
            evicted += 1;
        }
        self.evictions += evicted as u64;
        evicted
    }

    fn get_live(&mut self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let expired = match self.entries.get(key) {
            Some(slot) => slot.record.is_expired_at(now),
            None => {
                self.misses += 1;
                return None;
            }
        };

        if expired {
            self.remove_key(key);
            self.expirations += 1;
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.recency.touch(key);
        self.entries.get(key).map(|slot| slot.record.clone())
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.record.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_key(key);
        }
        self.expirations += expired.len() as u64;
        expired.len()
    }
}

/// Size- and time-bounded record store with LRU eviction.
#[derive(Debug)]
pub struct Store<T, X = NoIndex> {
    name: &'static str,
    limits: StoreLimits,
    state: Mutex<StoreState<T, X>>,
}

impl<T: CacheRecord, X: SideIndex<T>> Store<T, X> {
    /// Creates an empty store. `name` only labels log lines.
    pub fn new(name: &'static str, limits: StoreLimits) -> Self {
        Self { name, limits, state: Mutex::new(StoreState::new()) }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<T, X>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    /// Inserts a record, replacing any record under the same key.
    ///
    /// Evicts least-recently-touched records until `size` fits the byte
    /// budget, then trims the entry count back to `max_entries`.
    pub fn insert(&self, key: impl Into<String>, record: T, size: usize) -> Result<(), Error> {
        if size > self.limits.max_file_size {
            return Err(Error::EntryTooLarge { size, limit: self.limits.max_file_size });
        }

        let key = key.into();
        let mut state = self.lock();
        state.remove_key(&key);

        let by_budget = state.evict_for_budget(size, self.limits.max_total_size, None);

        state.index.on_insert(&key, &record);
        state.entries.insert(key.clone(), Slot { record, size });
        state.total_bytes += size;
        state.recency.touch(&key);

        let by_count = state.evict_for_count(self.limits.max_entries);

        if by_budget + by_count > 0 {
            tracing::debug!(
                store = self.name,
                by_budget,
                by_count,
                total_bytes = state.total_bytes,
                "evicted records on insert"
            );
        }

        Ok(())
    }

    /// Marks a record as recently used. Returns false if it is not present.
    pub fn touch(&self, key: &str) -> bool {
        let mut state = self.lock();
        if state.entries.contains_key(key) {
            state.recency.touch(key);
            true
        } else {
            false
        }
    }

    /// Looks up a record, removing it instead if its TTL has lapsed.
    pub fn get(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let record = self.lock().get_live(key, now);
        if record.is_none() {
            tracing::debug!(store = self.name, key, "cache miss");
        }
        record
    }

    /// Looks up a record through the side index.
    ///
    /// An alias whose target has expired or been evicted is dropped from the
    /// index.
    pub fn resolve(&self, alias: &str) -> Option<T> {
        self.resolve_at(alias, Utc::now())
    }

    pub fn resolve_at(&self, alias: &str, now: DateTime<Utc>) -> Option<T> {
        let mut state = self.lock();
        let key = state.index.lookup(alias)?;
        let record = state.get_live(&key, now);
        if record.is_none() {
            state.index.forget(alias);
        }
        record
    }

    /// Deletes the record if it has expired. Returns true if it was removed.
    pub fn remove_if_expired(&self, key: &str) -> bool {
        self.remove_if_expired_at(key, Utc::now())
    }

    pub fn remove_if_expired_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        let expired = state.entries.get(key).is_some_and(|slot| slot.record.is_expired_at(now));
        if expired {
            state.remove_key(key);
            state.expirations += 1;
        }
        expired
    }

    /// Removes every expired record and returns how many went.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let removed = self.lock().purge_expired(now);
        if removed > 0 {
            tracing::info!(store = self.name, removed, "TTL sweep removed expired records");
        } else {
            tracing::debug!(store = self.name, "TTL sweep found no expired records");
        }
        removed
    }

    /// Evicts least-recently-touched records until `incoming` more bytes fit.
    pub fn evict_for_budget(&self, incoming: usize) -> usize {
        self.lock().evict_for_budget(incoming, self.limits.max_total_size, None)
    }

    /// Evicts least-recently-touched records until the count is within bounds.
    pub fn evict_for_count(&self) -> usize {
        self.lock().evict_for_count(self.limits.max_entries)
    }

    /// Updates the accounted size of a live record.
    ///
    /// Other records are evicted for the growth first; the record itself is
    /// never chosen. Returns false if the record is no longer present.
    pub fn settle(&self, key: &str, size: usize) -> Result<bool, Error> {
        if size > self.limits.max_file_size {
            return Err(Error::EntryTooLarge { size, limit: self.limits.max_file_size });
        }

        let mut state = self.lock();
        let Some(current) = state.entries.get(key).map(|slot| slot.size) else {
            return Ok(false);
        };

        let growth = size.saturating_sub(current);
        let evicted = state.evict_for_budget(growth, self.limits.max_total_size, Some(key));
        if evicted > 0 {
            tracing::debug!(store = self.name, key, evicted, "evicted records to settle size");
        }

        if let Some(slot) = state.entries.get_mut(key) {
            slot.size = size;
        }
        state.total_bytes = state.total_bytes - current + size;
        Ok(true)
    }

    /// Removes a record regardless of expiry.
    pub fn remove(&self, key: &str) -> Option<T> {
        self.lock().remove_key(key).map(|slot| slot.record)
    }

    /// All live records in no particular order. Expired ones are purged.
    pub fn live(&self) -> Vec<T> {
        self.live_at(Utc::now())
    }

    pub fn live_at(&self, now: DateTime<Utc>) -> Vec<T> {
        let mut state = self.lock();
        state.purge_expired(now);
        state.entries.values().map(|slot| slot.record.clone()).collect()
    }

    /// Drops every record. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let keys: Vec<String> = state.entries.keys().cloned().collect();
        for key in &keys {
            state.remove_key(key);
        }
        state.recency.clear();
        keys.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.lock().total_bytes
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.lock();
        StoreStats {
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
            max_entries: self.limits.max_entries,
            max_total_size: self.limits.max_total_size,
            max_file_size: self.limits.max_file_size,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
        }
    }
}
