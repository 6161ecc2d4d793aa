use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entry::CacheEntry;

/// Expiration settings for one namespace.
///
/// A zero value disables the corresponding bound: `max_entries = 0` means no
/// count limit, `max_age_seconds = 0` means entries never expire by age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Expiration {
    pub max_entries: u64,
    pub max_age_seconds: u64,
}

impl Expiration {
    pub fn new(max_entries: u64, max_age_seconds: u64) -> Self {
        Self { max_entries, max_age_seconds }
    }
}

/// A named, bounded collection of cache entries kept in insertion order.
///
/// Overflow eviction is FIFO: once a `put` pushes the count past
/// `max_entries`, the least-recently-inserted entries are dropped until the
/// bound holds again. Age expiration is evaluated lazily at read time via
/// [`Namespace::get_fresh`]; expired entries stay in place until displaced,
/// so they remain available as a network-failure fallback.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    expiration: Expiration,
    entries: VecDeque<CacheEntry>,
}

impl Namespace {
    pub fn new(name: impl Into<String>, expiration: Expiration) -> Self {
        Self {
            name: name.into(),
            expiration,
            entries: VecDeque::new(),
        }
    }

    /// Rebuild a namespace from persisted entries, re-applying the current
    /// capacity bound (the configured limit may have shrunk since last run).
    pub fn from_entries(name: impl Into<String>, expiration: Expiration, entries: Vec<CacheEntry>) -> Self {
        let mut ns = Self {
            name: name.into(),
            expiration,
            entries: entries.into(),
        };
        ns.evict_over_capacity();
        ns
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up an entry regardless of age.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Look up an entry, treating anything older than the age limit as absent.
    pub fn get_fresh(&self, key: &str) -> Option<&CacheEntry> {
        self.get(key)
            .filter(|e| !e.is_expired(self.expiration.max_age_seconds))
    }

    /// Insert an entry, replacing any existing entry with the same key, then
    /// evict the oldest entries if the namespace is over capacity.
    pub fn put(&mut self, entry: CacheEntry) {
        self.entries.retain(|e| e.key != entry.key);
        self.entries.push_back(entry);
        self.evict_over_capacity();
    }

    /// Most recently inserted entry, if any.
    pub fn newest(&self) -> Option<&CacheEntry> {
        self.entries.back()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_over_capacity(&mut self) {
        if self.expiration.max_entries == 0 {
            return;
        }
        while self.entries.len() as u64 > self.expiration.max_entries {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(cache = %self.name, key = %evicted.key, "Evicted oldest entry over capacity");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(key: &str, body: &str) -> CacheEntry {
        CacheEntry::new(key, 200, vec![], body.as_bytes().to_vec())
    }

    #[test]
    fn test_put_and_get() {
        let mut ns = Namespace::new("pages", Expiration::new(10, 0));
        ns.put(entry("GET /a", "alpha"));
        assert_eq!(ns.get("GET /a").map(|e| e.body.as_slice()), Some(b"alpha".as_slice()));
        assert!(ns.get("GET /b").is_none());
    }

    #[test]
    fn test_overflow_evicts_oldest_first() {
        let mut ns = Namespace::new("images", Expiration::new(3, 0));
        for key in ["a", "b", "c", "d"] {
            ns.put(entry(key, key));
        }
        assert_eq!(ns.len(), 3);
        assert!(ns.get("a").is_none());
        assert!(ns.get("b").is_some());
        assert!(ns.get("d").is_some());
    }

    #[test]
    fn test_replacement_does_not_grow_count() {
        let mut ns = Namespace::new("api", Expiration::new(2, 0));
        ns.put(entry("a", "v1"));
        ns.put(entry("b", "v1"));
        ns.put(entry("a", "v2"));
        assert_eq!(ns.len(), 2);
        assert_eq!(ns.get("a").map(|e| e.body.as_slice()), Some(b"v2".as_slice()));
    }

    #[test]
    fn test_replaced_entry_moves_to_back_of_eviction_order() {
        let mut ns = Namespace::new("api", Expiration::new(2, 0));
        ns.put(entry("a", "v1"));
        ns.put(entry("b", "v1"));
        // Rewriting "a" makes "b" the oldest entry
        ns.put(entry("a", "v2"));
        ns.put(entry("c", "v1"));
        assert!(ns.get("b").is_none());
        assert!(ns.get("a").is_some());
        assert!(ns.get("c").is_some());
    }

    #[test]
    fn test_get_fresh_skips_expired_but_get_does_not() {
        let mut ns = Namespace::new("api", Expiration::new(10, 60));
        let mut old = entry("a", "stale");
        old.stored_at = Utc::now() - chrono::Duration::seconds(120);
        ns.put(old);

        assert!(ns.get_fresh("a").is_none());
        assert!(ns.get("a").is_some());
    }

    #[test]
    fn test_from_entries_reapplies_capacity() {
        let persisted = vec![entry("a", "1"), entry("b", "2"), entry("c", "3")];
        let ns = Namespace::from_entries("images", Expiration::new(2, 0), persisted);
        assert_eq!(ns.len(), 2);
        assert!(ns.get("a").is_none());
    }

    #[test]
    fn test_zero_max_entries_is_unbounded() {
        let mut ns = Namespace::new("pages", Expiration::new(0, 0));
        for i in 0..50 {
            ns.put(entry(&format!("k{}", i), "x"));
        }
        assert_eq!(ns.len(), 50);
    }
}
