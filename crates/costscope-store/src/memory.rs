use moka::sync::Cache;

/// In-memory hot cache of serialized results, keyed by request id.
///
/// Bounded by entry count. Stored results never change once written, so
/// there is no TTL; replacing a result goes through `insert` again.
pub struct MemoryCache {
    inner: Cache<String, String>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: String, value: String) {
        self.inner.insert(key, value);
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.invalidate(key);
    }

    /// Runs pending maintenance first so evictions are reflected.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let cache = MemoryCache::new(100);
        cache.insert("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
    }

    #[test]
    fn get_missing() {
        let cache = MemoryCache::new(100);
        assert_eq!(cache.get("nonexistent"), None);
    }

    #[test]
    fn invalidate() {
        let cache = MemoryCache::new(100);
        cache.insert("key1".to_string(), "value1".to_string());
        cache.invalidate("key1");
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn entry_count_tracks_inserts() {
        let cache = MemoryCache::new(100);
        cache.insert("a".to_string(), "1".to_string());
        cache.insert("b".to_string(), "2".to_string());
        assert_eq!(cache.entry_count(), 2);
    }
}
