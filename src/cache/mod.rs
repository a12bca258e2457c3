use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppResult;
use crate::models::{MediaKind, TrendingScope, TrendingWindow};

pub mod store;

mod macros;

pub use store::CacheStore;
pub use store::MemoryStore;
pub use store::RedisStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A fully assembled feed
    Feed(&'static str),
    /// Recommendation list for one title
    Recommendations(MediaKind, u64),
    /// Raw trending page
    Trending(TrendingScope, TrendingWindow),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Feed(name) => write!(f, "feed:{}", name),
            CacheKey::Recommendations(kind, id) => write!(f, "recs:{}:{}", kind, id),
            CacheKey::Trending(scope, window) => write!(f, "trending:{}:{}", scope, window),
        }
    }
}

/// Cache handle over a pluggable store, with request coalescing
///
/// Reads and writes fail open: a store that errors behaves like a miss on
/// read and like a dropped write on write, so callers never see cache
/// failures. [`Cache::get_or_compute`] additionally collapses concurrent
/// misses on one key into a single computation.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    in_flight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Reads and deserializes a cached value
    ///
    /// Store failures and undecodable entries are logged and reported as
    /// misses.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = match self.store.get(&key.to_string()).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Stale cache entry failed to decode");
                None
            }
        }
    }

    /// Serializes and writes a value; failures are logged and dropped
    pub async fn put_json<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        if let Err(e) = self.store.set(&key.to_string(), json, ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed, skipping");
        }
    }

    /// Coalesced read-through
    ///
    /// On a hit the cached value is returned directly. On a miss, callers
    /// racing on the same key serialize behind a per-key lock: the first one
    /// runs `compute` and writes the result before releasing, the rest
    /// re-check the cache once the lock is theirs and find the fresh entry.
    /// A failed computation is returned to its caller and caches nothing,
    /// so the next caller retries.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: u64,
        compute: F,
    ) -> AppResult<T>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(hit) = self.get_json(key).await {
            return Ok(hit);
        }

        let key_string = key.to_string();
        let flight = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(key_string.clone()).or_default().clone()
        };
        let guard = flight.lock().await;

        // Coalesced callers land here after the leader released; the
        // re-check turns them into hits without touching the upstream
        let result = match self.get_json(key).await {
            Some(hit) => Ok(hit),
            None => match compute().await {
                Ok(value) => {
                    self.put_json(key, &value, ttl).await;
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        };

        drop(guard);
        let mut in_flight = self.in_flight.lock().await;
        // Two strong references mean the registry entry and ours; nobody
        // else is queued on this key
        if Arc::strong_count(&flight) <= 2 {
            in_flight.remove(&key_string);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::Internal("store down".to_string()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: u64) -> AppResult<()> {
            Err(AppError::Internal("store down".to_string()))
        }
    }

    fn memory_cache() -> Cache {
        Cache::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_cache_key_display_feed() {
        assert_eq!(format!("{}", CacheKey::Feed("trending")), "feed:trending");
        assert_eq!(
            format!("{}", CacheKey::Feed("upcoming-trailers")),
            "feed:upcoming-trailers"
        );
    }

    #[test]
    fn test_cache_key_display_recommendations() {
        let key = CacheKey::Recommendations(MediaKind::Movie, 27205);
        assert_eq!(format!("{}", key), "recs:movie:27205");

        let key = CacheKey::Recommendations(MediaKind::Tv, 94796);
        assert_eq!(format!("{}", key), "recs:tv:94796");
    }

    #[test]
    fn test_cache_key_display_trending() {
        let key = CacheKey::Trending(TrendingScope::All, TrendingWindow::Day);
        assert_eq!(format!("{}", key), "trending:all:day");

        let key = CacheKey::Trending(TrendingScope::Tv, TrendingWindow::Week);
        assert_eq!(format!("{}", key), "trending:tv:week");
    }

    #[tokio::test]
    async fn test_get_or_compute_caches_first_result() {
        let cache = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::Feed("featured");

        for _ in 0..3 {
            let calls = calls.clone();
            let value: Vec<u64> = cache
                .get_or_compute(&key, 60, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_coalesces_concurrent_misses() {
        let cache = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::Feed("trending");

        let compute = || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(vec![1u64, 2, 3])
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_compute(&key, 60, compute),
            cache.get_or_compute(&key, 60, compute),
        );

        assert_eq!(a.unwrap(), vec![1, 2, 3]);
        assert_eq!(b.unwrap(), vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_error_caches_nothing() {
        let cache = memory_cache();
        let key = CacheKey::Feed("people");

        let failed: AppResult<Vec<u64>> = cache
            .get_or_compute(&key, 60, || async {
                Err(AppError::Upstream("boom".to_string()))
            })
            .await;
        assert!(failed.is_err());

        let value: Vec<u64> = cache
            .get_or_compute(&key, 60, || async { Ok(vec![7]) })
            .await
            .unwrap();
        assert_eq!(value, vec![7]);
    }

    #[tokio::test]
    async fn test_get_or_compute_survives_broken_store() {
        let cache = Cache::new(Arc::new(FailingStore));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::Feed("trailers");

        for _ in 0..2 {
            let calls = calls.clone();
            let value: Vec<u64> = cache
                .get_or_compute(&key, 60, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![9])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![9]);
        }

        // Nothing sticks without a working store, so every call computes
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_put_json_then_get_json_roundtrip() {
        let cache = memory_cache();
        let key = CacheKey::Recommendations(MediaKind::Movie, 42);

        cache.put_json(&key, &vec!["a", "b"], 60).await;
        let value: Option<Vec<String>> = cache.get_json(&key).await;
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[tokio::test]
    async fn test_get_json_with_undecodable_entry_is_miss() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("feed:featured", "not json".to_string(), 60)
            .await
            .unwrap();

        let cache = Cache::new(store);
        let value: Option<Vec<u64>> = cache.get_json(&CacheKey::Feed("featured")).await;
        assert_eq!(value, None);
    }
}
