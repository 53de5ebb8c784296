use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::error::CacheError;

use super::Cache;

const DEFAULT_CAPACITY: usize = 1024;

/// Bounded in-memory [`Cache`] with LRU eviction.
///
/// Suitable for single-process use and for tests; persistent or shared
/// backends implement [`Cache`] directly.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Capacity is clamped to at least one entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is non-zero");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.lock().await.put(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip() {
        let cache = MemoryCache::new();

        assert!(cache.get("missing").await.unwrap().is_none());

        cache.set("key", "value".to_string()).await.unwrap();
        assert_eq!(cache.get("key").await.unwrap().as_deref(), Some("value"));

        cache.clear().await;
        assert!(cache.get("key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let cache = MemoryCache::with_capacity(2);

        cache.set("a", "1".to_string()).await.unwrap();
        cache.set("b", "2".to_string()).await.unwrap();

        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a").await.unwrap().is_some());

        cache.set("c", "3".to_string()).await.unwrap();

        assert!(cache.get("a").await.unwrap().is_some());
        assert!(cache.get("b").await.unwrap().is_none());
        assert!(cache.get("c").await.unwrap().is_some());
    }
}
