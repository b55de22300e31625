use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::LocationResult;

struct CacheEntry {
    results: Vec<LocationResult>,
    timestamp: i64,
}

/// Query → results map with passive TTL expiry.
/// Stale entries stay until the same query overwrites them.
pub struct SearchCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl_ms: i64,
}

impl SearchCache {
    pub fn new(ttl_ms: i64) -> Self {
        SearchCache {
            entries: Mutex::new(HashMap::new()),
            ttl_ms,
        }
    }

    pub fn get(&self, query: &str, now: i64) -> Option<Vec<LocationResult>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(query)
            .filter(|entry| now - entry.timestamp < self.ttl_ms)
            .map(|entry| entry.results.clone())
    }

    pub fn insert(&self, query: &str, results: Vec<LocationResult>, now: i64) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            query.to_string(),
            CacheEntry {
                results,
                timestamp: now,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str) -> LocationResult {
        LocationResult {
            place_id: 1,
            lat: 0.0,
            lon: 0.0,
            display_name: name.to_string(),
            name: None,
            class: "place".to_string(),
            provider: "test",
        }
    }

    #[test]
    fn expires_passively() {
        let cache = SearchCache::new(1000);
        cache.insert("lagos", vec![result("Lagos")], 0);
        assert!(cache.get("lagos", 999).is_some());
        assert!(cache.get("lagos", 1000).is_none());
        // not evicted, only ignored
        assert_eq!(cache.len(), 1);
        assert!(cache.get("Lagos", 0).is_none());

        cache.clear();
        assert!(cache.is_empty());
    }
}
