//! Cache backend capability and the in-memory backend.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::entry::CacheEntry;

/// Backend failures. The facade downgrades these to cache misses so
/// that cache unavailability never fails rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(String),

    #[error("cache serialization error: {0}")]
    Serialization(String),
}

/// Storage capability for cache entries. Implementations own the
/// serialization codec and eviction strategy.
#[async_trait]
pub trait FragmentCache: Send + Sync {
    async fn try_get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    async fn set(&self, key: &str, ttl: Duration, entry: CacheEntry) -> Result<(), CacheError>;
}

struct StoredEntry {
    expires_at: Instant,
    entry: CacheEntry,
}

/// In-process cache backend with read-time expiry, suitable for
/// development and tests.
#[derive(Default)]
pub struct MemoryFragmentCache {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryFragmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including not-yet-pruned expired ones.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FragmentCache for MemoryFragmentCache {
    async fn try_get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| CacheError::Storage(String::from("lock poisoned")))?;
        Ok(entries
            .get(key)
            .filter(|stored| stored.expires_at > Instant::now())
            .map(|stored| stored.entry.clone()))
    }

    async fn set(&self, key: &str, ttl: Duration, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheError::Storage(String::from("lock poisoned")))?;
        entries.insert(
            key.to_string(),
            StoredEntry {
                expires_at: Instant::now() + ttl,
                entry,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esi_core::Fragment;
    use std::collections::BTreeMap;

    fn entry(body: &str) -> CacheEntry {
        CacheEntry::new(Fragment::text(body), BTreeMap::new())
    }

    #[tokio::test]
    async fn test_round_trip_within_ttl() {
        let cache = MemoryFragmentCache::new();
        cache
            .set("key", Duration::from_secs(60), entry("cached"))
            .await
            .unwrap();
        assert_eq!(cache.try_get("key").await.unwrap(), Some(entry("cached")));
    }

    #[tokio::test]
    async fn test_miss_on_unknown_key() {
        let cache = MemoryFragmentCache::new();
        assert_eq!(cache.try_get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryFragmentCache::new();
        cache
            .set("key", Duration::from_millis(10), entry("cached"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.try_get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_replaces_existing_entry() {
        let cache = MemoryFragmentCache::new();
        cache
            .set("key", Duration::from_secs(60), entry("old"))
            .await
            .unwrap();
        cache
            .set("key", Duration::from_secs(60), entry("new"))
            .await
            .unwrap();
        assert_eq!(cache.try_get("key").await.unwrap(), Some(entry("new")));
        assert_eq!(cache.len(), 1);
    }
}
