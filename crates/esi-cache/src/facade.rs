//! Vary-aware cache access with degrade-to-miss semantics.

use std::sync::Arc;
use std::time::Duration;

use esi_core::RequestDescriptor;
use tracing::warn;

use crate::entry::CacheEntry;
use crate::key::{vary_key, VaryStore};
use crate::store::FragmentCache;

/// Combines a cache backend with a vary store. Backend failures are
/// logged and treated as misses; rendering never fails on cache
/// unavailability.
pub struct CacheFacade {
    cache: Arc<dyn FragmentCache>,
    vary: Arc<dyn VaryStore>,
}

impl CacheFacade {
    pub fn new(cache: Arc<dyn FragmentCache>, vary: Arc<dyn VaryStore>) -> Self {
        Self { cache, vary }
    }

    /// The key the current request maps to, folding in recorded vary
    /// headers.
    pub fn request_key(&self, base_key: &str, request: &RequestDescriptor) -> String {
        match self.vary.get(base_key) {
            Some(names) => vary_key(base_key, &names, request),
            None => base_key.to_string(),
        }
    }

    pub async fn try_get(&self, base_key: &str, request: &RequestDescriptor) -> Option<CacheEntry> {
        let key = self.request_key(base_key, request);
        match self.cache.try_get(&key).await {
            Ok(found) => found,
            Err(error) => {
                warn!(%error, key = %key, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Record the response's vary header names (already normalized)
    /// and store the entry under the varied key.
    pub async fn store(
        &self,
        base_key: &str,
        request: &RequestDescriptor,
        vary_names: Vec<String>,
        ttl: Duration,
        entry: CacheEntry,
    ) {
        if !vary_names.is_empty() {
            self.vary.record(base_key, vary_names.clone());
        }
        let key = vary_key(base_key, &vary_names, request);
        if let Err(error) = self.cache.set(&key, ttl, entry).await {
            warn!(%error, key = %key, "cache write failed; entry dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::MemoryVaryStore;
    use crate::store::{CacheError, MemoryFragmentCache};
    use async_trait::async_trait;
    use esi_core::Fragment;
    use std::collections::BTreeMap;

    fn entry(body: &str) -> CacheEntry {
        CacheEntry::new(Fragment::text(body), BTreeMap::new())
    }

    fn facade() -> CacheFacade {
        CacheFacade::new(
            Arc::new(MemoryFragmentCache::new()),
            Arc::new(MemoryVaryStore::new()),
        )
    }

    #[tokio::test]
    async fn test_store_then_get_without_vary() {
        let facade = facade();
        let request = RequestDescriptor::new("http", "host", "/page");
        facade
            .store(
                "http://host/f",
                &request,
                Vec::new(),
                Duration::from_secs(60),
                entry("cached"),
            )
            .await;
        assert_eq!(
            facade.try_get("http://host/f", &request).await,
            Some(entry("cached"))
        );
    }

    #[tokio::test]
    async fn test_varied_header_value_splits_entries() {
        let facade = facade();
        let swedish = RequestDescriptor::new("http", "host", "/page")
            .with_header("Accept-Language", "sv");
        let english = RequestDescriptor::new("http", "host", "/page")
            .with_header("Accept-Language", "en");

        facade
            .store(
                "http://host/f",
                &swedish,
                vec![String::from("accept-language")],
                Duration::from_secs(60),
                entry("swedish"),
            )
            .await;

        assert_eq!(
            facade.try_get("http://host/f", &swedish).await,
            Some(entry("swedish"))
        );
        assert_eq!(facade.try_get("http://host/f", &english).await, None);
    }

    struct BrokenCache;

    #[async_trait]
    impl FragmentCache for BrokenCache {
        async fn try_get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Storage(String::from("backend down")))
        }

        async fn set(
            &self,
            _key: &str,
            _ttl: Duration,
            _entry: CacheEntry,
        ) -> Result<(), CacheError> {
            Err(CacheError::Storage(String::from("backend down")))
        }
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_miss() {
        let facade = CacheFacade::new(Arc::new(BrokenCache), Arc::new(MemoryVaryStore::new()));
        let request = RequestDescriptor::new("http", "host", "/page");
        assert_eq!(facade.try_get("http://host/f", &request).await, None);
        // A failing write is swallowed as well.
        facade
            .store(
                "http://host/f",
                &request,
                Vec::new(),
                Duration::from_secs(60),
                entry("lost"),
            )
            .await;
    }
}
