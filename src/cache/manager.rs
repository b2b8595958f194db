//! Cache Manager Module
//!
//! Typed, fail-open front for a [`CacheBackend`]. No method here returns an
//! error: a broken backend degrades to "always miss" and is only visible in
//! logs and statistics.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheBackend, CacheStats, InvalidationPlan, StatsSnapshot};

/// Invalidation counter value observed at the start of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

// == Cache Manager ==
/// Long-lived cache handle shared by every service.
pub struct CacheManager {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    generation: AtomicU64,
    stats: CacheStats,
}

impl CacheManager {
    /// Creates a manager writing every entry with the given TTL.
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            generation: AtomicU64::new(0),
            stats: CacheStats::new(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Current invalidation generation. Capture it before reading the store
    /// and hand it to [`CacheManager::populate`].
    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::SeqCst))
    }

    // == Get ==
    /// Cached value for `key`, or `None` on miss, backend failure or a value
    /// that no longer decodes.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.stats.record_miss();
                return None;
            }
            Err(err) => {
                warn!(%key, error = %err, "cache read failed, falling back to store");
                self.stats.record_read_failure();
                self.stats.record_miss();
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(%key, "cache hit");
                self.stats.record_hit();
                Some(value)
            }
            Err(err) => {
                warn!(%key, error = %err, "cached value does not decode, treating as miss");
                self.stats.record_read_failure();
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` with the configured TTL. Returns whether it was written.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%key, error = %err, "could not encode value for cache");
                self.stats.record_write_failure();
                return false;
            }
        };

        match self.backend.set(key, raw, self.ttl).await {
            Ok(()) => {
                self.stats.record_write();
                true
            }
            Err(err) => {
                warn!(%key, error = %err, "cache write failed");
                self.stats.record_write_failure();
                false
            }
        }
    }

    // == Populate ==
    /// Writes a value loaded from the store, unless an invalidation ran since
    /// `observed` was taken. If one lands while the write is in flight the
    /// entry is removed again, so invalidation always wins.
    pub async fn populate<T: Serialize>(&self, key: &str, value: &T, observed: Generation) -> bool {
        if self.generation() != observed {
            debug!(%key, "skipping populate, invalidated during read");
            self.stats.record_stale_populate();
            return false;
        }

        if !self.set(key, value).await {
            return false;
        }

        if self.generation() != observed {
            debug!(%key, "populate overtaken by invalidation, dropping entry");
            self.stats.record_stale_populate();
            self.delete(key).await;
            return false;
        }

        true
    }

    // == Read Through ==
    /// Cache-aside read: answer from cache, otherwise run `load` and populate
    /// with its result. Errors from `load` are returned as-is and never cached.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }

        let observed = self.generation();
        let value = load().await?;
        self.populate(key, &value, observed).await;
        Ok(value)
    }

    // == Delete ==
    /// Removes one key. Returns false only if the backend failed.
    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.delete(key).await {
            Ok(_) => true,
            Err(err) => {
                warn!(%key, error = %err, "cache delete failed");
                self.stats.record_write_failure();
                false
            }
        }
    }

    // == Delete By Pattern ==
    /// Removes every key matching the glob. Returns false only if the
    /// backend failed.
    pub async fn delete_pattern(&self, pattern: &str) -> bool {
        match self.backend.delete_matching(pattern).await {
            Ok(removed) => {
                debug!(%pattern, removed, "pattern invalidated");
                true
            }
            Err(err) => {
                warn!(%pattern, error = %err, "cache pattern delete failed");
                self.stats.record_write_failure();
                false
            }
        }
    }

    // == Invalidate ==
    /// Executes a plan. Call only after the store write has committed.
    pub async fn invalidate(&self, plan: &InvalidationPlan) {
        if plan.is_empty() {
            return;
        }

        // Bump first: populates racing with this round see the new generation.
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.stats.record_invalidation();

        for key in &plan.keys {
            self.delete(key).await;
        }
        for pattern in &plan.patterns {
            self.delete_pattern(pattern).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{keys, BackendError, MemoryBackend};
    use async_trait::async_trait;

    const TTL: Duration = Duration::from_secs(300);

    /// Backend that is always down.
    struct DownBackend;

    #[async_trait]
    impl CacheBackend for DownBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }
        async fn set(&self, _: &str, _: String, _: Duration) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<bool, BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }
        async fn delete_matching(&self, _pattern: &str) -> Result<usize, BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }
    }

    fn memory_manager() -> (Arc<MemoryBackend>, CacheManager) {
        let backend = Arc::new(MemoryBackend::new(100));
        let manager = CacheManager::new(backend.clone(), TTL);
        (backend, manager)
    }

    #[tokio::test]
    async fn test_set_and_get_typed() {
        let (_, cache) = memory_manager();

        assert!(cache.set("numbers", &vec![1, 2, 3]).await);
        let hit: Option<Vec<i32>> = cache.get("numbers").await;

        assert_eq!(hit, Some(vec![1, 2, 3]));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_empty_list_is_a_hit() {
        let (_, cache) = memory_manager();

        cache.set("products:0:100:all:false", &Vec::<i32>::new()).await;
        let hit: Option<Vec<i32>> = cache.get("products:0:100:all:false").await;

        assert_eq!(hit, Some(vec![]));
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let (backend, cache) = memory_manager();
        backend.set("key", "not json".to_string(), TTL).await.unwrap();

        let hit: Option<Vec<i32>> = cache.get("key").await;

        assert_eq!(hit, None);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.read_failures, 1);
    }

    #[tokio::test]
    async fn test_backend_outage_is_invisible() {
        let cache = CacheManager::new(Arc::new(DownBackend), TTL);

        assert_eq!(cache.get::<String>("key").await, None);
        assert!(!cache.set("key", &"value").await);
        assert!(!cache.delete("key").await);
        assert!(!cache.delete_pattern("key*").await);
        cache
            .invalidate(&InvalidationPlan::category_created())
            .await;

        let loaded: Result<String, ()> = cache
            .get_or_load("key", || async { Ok("from store".to_string()) })
            .await;
        assert_eq!(loaded, Ok("from store".to_string()));
    }

    #[tokio::test]
    async fn test_get_or_load_populates_once() {
        let (_, cache) = memory_manager();
        let mut loads = 0;

        for _ in 0..3 {
            let value: Result<String, ()> = cache
                .get_or_load("category:1:true", || {
                    loads += 1;
                    async { Ok("books".to_string()) }
                })
                .await;
            assert_eq!(value.unwrap(), "books");
        }

        assert_eq!(loads, 1);
        assert_eq!(cache.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_get_or_load_does_not_cache_errors() {
        let (backend, cache) = memory_manager();

        let result: Result<String, &str> = cache
            .get_or_load("category:9:true", || async { Err("not found") })
            .await;

        assert_eq!(result, Err("not found"));
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_populate_after_invalidation_is_discarded() {
        let (backend, cache) = memory_manager();

        let observed = cache.generation();
        cache
            .invalidate(&InvalidationPlan::category_deleted(1))
            .await;

        assert!(!cache.populate(&keys::category(1, true), &"stale", observed).await);
        assert!(backend.is_empty().await);
        assert_eq!(cache.stats().stale_populates, 1);
    }

    #[tokio::test]
    async fn test_invalidate_executes_plan() {
        let (backend, cache) = memory_manager();
        for key in [
            "category:1:true",
            "category:1:false",
            "category:2:true",
            "categories:0:100:false",
            "categories:0:10:true",
        ] {
            cache.set(key, &"x").await;
        }

        cache
            .invalidate(&InvalidationPlan::category_updated(1, false))
            .await;

        assert_eq!(backend.keys().await, vec!["category:2:true".to_string()]);
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[tokio::test]
    async fn test_empty_plan_keeps_generation() {
        let (_, cache) = memory_manager();
        let before = cache.generation();

        cache.invalidate(&InvalidationPlan::new()).await;

        assert_eq!(cache.generation(), before);
    }
}
