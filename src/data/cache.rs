//! Shared in-memory caching
//!
//! Keyed TTL caches for the calendar and rate lookups. Values are
//! cloned out on read; refreshes are single-flight per key, so
//! concurrent misses for the same key do one upstream call while other
//! keys proceed independently.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::core::GexResult;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory cache with per-entry expiry
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    in_flight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or compute it with `fetch`
    /// and cache it for `ttl`. Errors are returned to the caller and
    /// never cached.
    pub fn get_or_insert_with(
        &self,
        key: K,
        ttl: Duration,
        fetch: impl FnOnce() -> GexResult<V>,
    ) -> GexResult<V> {
        if let Some(value) = self.fresh_value(&key) {
            return Ok(value);
        }

        let gate = {
            let mut in_flight = lock(&self.in_flight);
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        // Holding the gate serializes refreshes of this key only.
        let _guard = lock(&gate);

        // Another caller may have refreshed while we waited.
        if let Some(value) = self.fresh_value(&key) {
            return Ok(value);
        }

        let result = fetch();
        if let Ok(value) = &result {
            let mut entries = lock(&self.entries);
            entries.insert(
                key.clone(),
                Entry {
                    value: value.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }

        let mut in_flight = lock(&self.in_flight);
        in_flight.remove(&key);

        result
    }

    /// Drop entries whose TTL has elapsed
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut entries = lock(&self.entries);
        entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries, expired or not
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    fn fresh_value(&self, key: &K) -> Option<V> {
        let entries = lock(&self.entries);
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// A panicked fetch must not wedge the cache for later callers.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
