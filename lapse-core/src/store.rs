use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::entry::Entry;

/// Default limit for search_keys operations
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Maximum limit for search_keys operations (hard cap)
pub const MAX_SEARCH_LIMIT: usize = 250;

/// Maximum number of keys to scan during search operations.
/// Bounds the allocation a single search can cause on large stores.
pub const MAX_SEARCH_SCAN: usize = 10_000;

struct StoreInner<V> {
    data: DashMap<String, Entry<V>>,
    clock: Arc<dyn Clock>,
}

/// Thread-safe in-memory key-value store with per-entry expiry
///
/// Expiry is lazy: an expired entry stays in the map until the next `get` or
/// `contains_key` for its key notices it and removes it, or until
/// [`purge_expired`](Self::purge_expired) is called. Nothing sweeps in the
/// background.
///
/// Cloning is cheap and clones share the same data.
///
/// # Example
///
/// ```rust
/// use lapse_core::ExpiringStore;
///
/// let store: ExpiringStore<String> = ExpiringStore::new();
/// store.set("user:123", "John Doe".to_string(), Some(60));
/// assert_eq!(store.get("user:123").as_deref(), Some("John Doe"));
///
/// store.delete("user:123");
/// assert_eq!(store.get("user:123"), None);
/// ```
pub struct ExpiringStore<V> {
    inner: Arc<StoreInner<V>>,
}

impl<V> Clone for ExpiringStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for ExpiringStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("entries", &self.inner.data.len())
            .field("clock", &self.inner.clock)
            .finish()
    }
}

impl<V: Clone> ExpiringStore<V> {
    /// Creates an empty store driven by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store that reads time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                data: DashMap::new(),
                clock,
            }),
        }
    }

    fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    /// Stores a value, overwriting any previous entry for the key
    ///
    /// `ttl_seconds` of `None` means the entry never expires. `Some(0)` stores an
    /// entry that is already invisible.
    pub fn set(&self, key: impl Into<String>, value: V, ttl_seconds: Option<u64>) {
        self.set_with_ttl(key, value, ttl_seconds.map(Duration::from_secs));
    }

    /// Same as [`set`](Self::set) with a `Duration` TTL
    ///
    /// A TTL too large to represent as an `Instant` is treated as "never expires".
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let expires_at = ttl.and_then(|ttl| self.now().checked_add(ttl));
        self.inner.data.insert(key.into(), Entry::new(value, expires_at));
    }

    /// Retrieves a value by key
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired entry
    /// is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.now();
        let entry = self.inner.data.get(key)?;

        if entry.value().is_expired_at(now) {
            drop(entry);
            self.remove_if_expired(key, now);
            return None;
        }

        Some(entry.value().value().clone())
    }

    /// Checks if a key exists and is not expired, removing it if it has expired
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.now();
        match self.inner.data.get(key) {
            Some(entry) if entry.value().is_expired_at(now) => {
                drop(entry);
                self.remove_if_expired(key, now);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Remaining lifetime of a visible entry
    ///
    /// `None` if the key is absent or expired, `Some(None)` if it never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let now = self.now();
        let entry = self.inner.data.get(key)?;

        if entry.value().is_expired_at(now) {
            drop(entry);
            self.remove_if_expired(key, now);
            return None;
        }

        Some(entry.value().remaining_at(now))
    }

    // remove_if re-checks under the shard lock so a concurrent overwrite with a
    // fresh entry is not thrown away.
    fn remove_if_expired(&self, key: &str, now: Instant) {
        if self
            .inner
            .data
            .remove_if(key, |_, entry| entry.is_expired_at(now))
            .is_some()
        {
            tracing::trace!(key_len = key.len(), "removed expired entry on access");
        }
    }

    /// Removes and returns a visible entry if `predicate` accepts its value
    ///
    /// The expiry check, the predicate and the removal happen under one shard
    /// lock, so at most one caller can take a given entry and a concurrent
    /// overwrite is never removed by a predicate that saw the old value.
    pub fn take_if<F>(&self, key: &str, predicate: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool,
    {
        let now = self.now();
        let taken = self
            .inner
            .data
            .remove_if(key, |_, entry| !entry.is_expired_at(now) && predicate(entry.value()))
            .map(|(_, entry)| entry.into_value());

        if taken.is_none() {
            self.remove_if_expired(key, now);
        }
        taken
    }

    /// Deletes a key from the store
    ///
    /// Returns `true` if an entry existed (regardless of expiration), `false` otherwise.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.data.remove(key).is_some()
    }

    /// Deletes all entries from the store
    ///
    /// Returns the approximate number of entries removed; concurrent writers
    /// may race with the count.
    pub fn clear(&self) -> usize {
        let count = self.inner.data.len();
        self.inner.data.clear();
        count
    }

    /// Removes every entry that has expired as of now
    ///
    /// Never called implicitly. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.now();
        let mut removed = 0;

        self.inner.data.retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// Number of stored entries, including expired ones not yet removed
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    /// Returns `true` if the store holds no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Returns all keys that are not expired
    pub fn keys(&self) -> Vec<String> {
        let now = self.now();
        self.inner
            .data
            .iter()
            .filter(|entry| !entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Searches visible keys by prefix with pagination
    ///
    /// Returns the requested page of matching keys, sorted alphabetically, and the
    /// total number of matches before pagination.
    ///
    /// * `prefix` - empty string matches all keys
    /// * `limit` - page size (default 50, capped at 250)
    /// * `skip` - matches to skip before the page starts (default 0)
    ///
    /// This walks the whole map (up to `MAX_SEARCH_SCAN` matches) and is meant for
    /// inspection, not hot paths.
    pub fn search_keys(
        &self,
        prefix: &str,
        limit: Option<usize>,
        skip: Option<usize>,
    ) -> (Vec<String>, usize) {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);
        let skip = skip.unwrap_or(0);
        let now = self.now();

        let mut matching: Vec<String> = self
            .inner
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .filter(|entry| !entry.value().is_expired_at(now))
            .take(MAX_SEARCH_SCAN)
            .map(|entry| entry.key().clone())
            .collect();

        matching.sort();
        let total = matching.len();

        let page = matching.into_iter().skip(skip).take(limit).collect();
        (page, total)
    }
}

impl<V: Clone> Default for ExpiringStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
