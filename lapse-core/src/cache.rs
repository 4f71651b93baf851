//! Read-through cache for serializable responses.
//!
//! Payloads are stored as JSON text so one cache instance can hold values of
//! different types under different keys.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::store::ExpiringStore;

/// Expiring cache of JSON-encoded values
#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: ExpiringStore<String>,
    config: CacheConfig,
}

impl ResponseCache {
    /// Creates a cache with default configuration and the system clock
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: ExpiringStore::new(),
            config,
        }
    }

    /// Creates a cache that reads time from `clock`
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: ExpiringStore::with_clock(clock),
            config,
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its result
    ///
    /// `ttl` falls back to the configured default. An error from `fetch` is
    /// returned as is and nothing is cached. A cached payload that no longer
    /// decodes as `T` counts as a miss.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lapse_core::ResponseCache;
    /// use std::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let cache = ResponseCache::new();
    /// let courses: Result<Vec<String>, std::io::Error> = cache
    ///     .wrap("courses:all", Some(Duration::from_secs(60)), || async {
    ///         Ok(vec!["rust-101".to_string()])
    ///     })
    ///     .await;
    /// assert_eq!(courses.unwrap(), vec!["rust-101"]);
    /// # }
    /// ```
    pub async fn wrap<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get_json::<T>(key) {
            Ok(Some(value)) => {
                tracing::trace!(key_len = key.len(), "cache hit");
                return Ok(value);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(key_len = key.len(), error = %err, "dropping undecodable cache entry");
                let _ = self.entries.delete(key);
            }
        }

        let value = fetch().await?;

        if let Err(err) = self.set_json(key, &value, ttl) {
            tracing::warn!(key_len = key.len(), error = %err, "failed to cache fetched value");
        }

        Ok(value)
    }

    /// Decodes the cached value for `key`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.entries.get(key) {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(CacheError::Deserialization),
            None => Ok(None),
        }
    }

    /// Encodes and stores `value` under `key`
    ///
    /// `ttl` falls back to the configured default.
    pub fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(value).map_err(CacheError::Serialization)?;
        self.entries.set_with_ttl(key, json, ttl.or(self.config.default_ttl));
        Ok(())
    }

    /// Drops the cached value for `key`; returns whether one existed
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.delete(key)
    }

    /// Drops every cached value
    pub fn clear(&self) -> usize {
        self.entries.clear()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Course {
        id: u32,
        title: String,
    }

    #[derive(Debug, PartialEq)]
    struct FetchError(&'static str);

    fn create_test_cache(config: CacheConfig) -> (ResponseCache, ManualClock) {
        let clock = ManualClock::new();
        let cache = ResponseCache::with_clock(config, Arc::new(clock.clone()));
        (cache, clock)
    }

    fn course() -> Course {
        Course {
            id: 7,
            title: "Ownership".to_string(),
        }
    }

    #[tokio::test]
    async fn test_wrap_fetches_once_within_ttl() {
        let (cache, clock) = create_test_cache(CacheConfig::default());
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let result: Result<Course, FetchError> = cache
                .wrap("course:7", Some(Duration::from_secs(60)), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(course())
                })
                .await;
            assert_eq!(result, Ok(course()));
            clock.advance(Duration::from_secs(10));
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrap_refetches_after_expiry() {
        let (cache, clock) = create_test_cache(CacheConfig::default());
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, FetchError>(course())
        };

        cache.wrap("course:7", Some(Duration::from_secs(5)), fetch).await.unwrap();
        clock.advance(Duration::from_secs(5));
        cache.wrap("course:7", Some(Duration::from_secs(5)), fetch).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wrap_does_not_cache_errors() {
        let (cache, _) = create_test_cache(CacheConfig::default());

        let result: Result<Course, FetchError> = cache
            .wrap("course:7", None, || async { Err(FetchError("db down")) })
            .await;
        assert_eq!(result, Err(FetchError("db down")));

        let cached: Option<Course> = cache.get_json("course:7").unwrap();
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_wrap_uses_configured_default_ttl() {
        let config = CacheConfig::new().with_default_ttl(Duration::from_secs(30));
        let (cache, clock) = create_test_cache(config);

        let _: Result<Course, FetchError> =
            cache.wrap("course:7", None, || async { Ok(course()) }).await;

        clock.advance(Duration::from_secs(29));
        assert_eq!(cache.get_json::<Course>("course:7").unwrap(), Some(course()));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get_json::<Course>("course:7").unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrap_treats_undecodable_entry_as_miss() {
        let (cache, _) = create_test_cache(CacheConfig::default());
        cache.set_json("course:7", "not a course", None).unwrap();

        let result: Result<Course, FetchError> =
            cache.wrap("course:7", None, || async { Ok(course()) }).await;

        assert_eq!(result, Ok(course()));
        assert_eq!(cache.get_json::<Course>("course:7").unwrap(), Some(course()));
    }

    #[tokio::test]
    async fn test_wrap_returns_value_that_cannot_be_cached() {
        let (cache, _) = create_test_cache(CacheConfig::default());
        // JSON objects need string keys, so this map fails to serialize
        let grid: HashMap<(u32, u32), u32> = HashMap::from([((0, 1), 5)]);

        let result: Result<HashMap<(u32, u32), u32>, FetchError> = cache
            .wrap("grid", None, || async { Ok(grid.clone()) })
            .await;

        assert_eq!(result, Ok(grid));
        assert!(matches!(
            cache.set_json("grid", &HashMap::from([((0u32, 1u32), 5u32)]), None),
            Err(CacheError::Serialization(_))
        ));
        assert_eq!(cache.get_json::<HashMap<(u32, u32), u32>>("grid").unwrap(), None);
    }

    #[test]
    fn test_get_json_type_mismatch_is_error() {
        let (cache, _) = create_test_cache(CacheConfig::default());
        cache.set_json("n", &42u32, None).unwrap();

        let err = cache.get_json::<Course>("n").unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let (cache, _) = create_test_cache(CacheConfig::default());
        cache.set_json("a", &1u32, None).unwrap();
        cache.set_json("b", &2u32, None).unwrap();

        assert!(cache.invalidate("a"));
        assert_eq!(cache.get_json::<u32>("a").unwrap(), None);
        assert_eq!(cache.clear(), 1);
        assert_eq!(cache.get_json::<u32>("b").unwrap(), None);
    }
}
