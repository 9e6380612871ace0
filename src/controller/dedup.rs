//! # Dedup Cache
//!
//! Remembers the last resource version applied per record so a replayed watch
//! event does not trigger another round of backend calls. Lives for the
//! process lifetime; entries are never evicted.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DedupCache {
    applied: HashMap<String, String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` was last applied at exactly `resource_version`
    pub fn is_applied(&self, key: &str, resource_version: &str) -> bool {
        self.applied
            .get(key)
            .is_some_and(|applied| applied == resource_version)
    }

    /// Record a successful apply
    pub fn record(&mut self, key: impl Into<String>, resource_version: impl Into<String>) {
        self.applied.insert(key.into(), resource_version.into());
    }

    pub fn len(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_lookup() {
        let mut cache = DedupCache::new();
        assert!(!cache.is_applied("ns/a", "1"));

        cache.record("ns/a", "1");
        assert!(cache.is_applied("ns/a", "1"));
        assert!(!cache.is_applied("ns/a", "2"));
        assert!(!cache.is_applied("ns/b", "1"));
    }

    #[test]
    fn test_newer_version_replaces_entry() {
        let mut cache = DedupCache::new();
        cache.record("ns/a", "1");
        cache.record("ns/a", "2");
        assert_eq!(cache.len(), 1);
        assert!(cache.is_applied("ns/a", "2"));
        assert!(!cache.is_applied("ns/a", "1"));
    }
}
