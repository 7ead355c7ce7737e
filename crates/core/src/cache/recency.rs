//! Recency ordering for LRU and byte-budget eviction.

use std::collections::{BTreeMap, HashMap};

/// Tracks touch order of keys, least-recently-touched first.
///
/// Every touch stamps the key with a fresh tick, so the smallest tick is the
/// oldest key. Touch, remove and pop are `O(log n)`.
#[derive(Debug, Default)]
pub struct RecencyList {
    tick: u64,
    order: BTreeMap<u64, String>,
    positions: HashMap<String, u64>,
}

impl RecencyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key as most recently used, inserting it if new.
    pub fn touch(&mut self, key: &str) {
        self.tick += 1;
        if let Some(old) = self.positions.insert(key.to_string(), self.tick) {
            self.order.remove(&old);
        }
        self.order.insert(self.tick, key.to_string());
    }

    /// Removes a key. Returns false if it was not tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.positions.remove(key) {
            Some(tick) => {
                self.order.remove(&tick);
                true
            }
            None => false,
        }
    }

    /// The least recently touched key.
    pub fn oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    /// The least recently touched key other than `skip`.
    pub fn oldest_except(&self, skip: &str) -> Option<&str> {
        self.order.values().map(String::as_str).find(|key| *key != skip)
    }

    /// Keys from least to most recently touched.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.values().map(String::as_str)
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_new_keys() {
        let mut list = RecencyList::new();
        list.touch("key1");
        list.touch("key2");
        list.touch("key3");

        assert_eq!(list.len(), 3);
        assert_eq!(list.oldest(), Some("key1"));
    }

    #[test]
    fn test_touch_existing_key_moves_to_back() {
        let mut list = RecencyList::new();
        list.touch("a");
        list.touch("b");
        list.touch("c");
        list.touch("a");

        assert_eq!(list.len(), 3);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_remove() {
        let mut list = RecencyList::new();
        list.touch("key1");
        list.touch("key2");

        assert!(list.remove("key1"));
        assert!(!list.remove("key1"));
        assert!(!list.contains("key1"));
        assert_eq!(list.oldest(), Some("key2"));
    }

    #[test]
    fn test_oldest_except() {
        let mut list = RecencyList::new();
        list.touch("pinned");
        list.touch("other");

        assert_eq!(list.oldest_except("pinned"), Some("other"));
        assert_eq!(list.oldest_except("missing"), Some("pinned"));

        list.remove("other");
        assert_eq!(list.oldest_except("pinned"), None);
    }

    #[test]
    fn test_repeated_touch_keeps_single_entry() {
        let mut list = RecencyList::new();
        list.touch("key1");
        list.touch("key1");
        list.touch("key1");

        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().count(), 1);
    }

    #[test]
    fn test_clear() {
        let mut list = RecencyList::new();
        list.touch("a");
        list.touch("b");
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.oldest(), None);
    }
}
