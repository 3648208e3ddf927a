//! Time-bounded memoization of resolutions
//!
//! Each key owns a slot behind an async mutex that stays locked for the
//! whole check, compute and store sequence, so concurrent lookups for the
//! same key share one computation. The map of slots is behind a plain
//! mutex that is only held long enough to fetch or insert a slot.

use crate::error::GitspaceResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

type Slot<V> = Arc<tokio::sync::Mutex<Option<Entry<V>>>>;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    created: Instant,
    resolved_at: DateTime<Utc>,
}

/// Point-in-time view of one cached value
#[derive(Debug, Clone)]
pub struct CacheSnapshot<V> {
    pub value: V,

    /// Time since the value was computed
    pub age: Duration,

    /// Wall-clock time of the computation
    pub resolved_at: DateTime<Utc>,

    /// Whether a lookup now would be served from cache
    pub fresh: bool,
}

/// Cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
}

/// Per-key TTL cache with single-flight computation
pub struct ResolutionCache<V> {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ResolutionCache<V> {
    /// Create a cache whose entries live for `ttl` (zero disables caching)
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the value for `key`, computing it on a miss or after expiry
    ///
    /// Errors from `compute` are returned as-is and leave the key empty.
    /// Dropping the returned future mid-computation also stores nothing.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> GitspaceResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GitspaceResult<V>>,
    {
        if ttl.is_zero() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return compute().await;
        }

        let slot = self.slot(key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.created.elapsed() < ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key, "Cache hit");
                return Ok(entry.value.clone());
            }
            debug!(key, age_ms = entry.created.elapsed().as_millis() as u64, "Cache entry expired");
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match compute().await {
            Ok(value) => {
                *guard = Some(Entry {
                    value: value.clone(),
                    created: Instant::now(),
                    resolved_at: Utc::now(),
                });
                Ok(value)
            }
            Err(e) => {
                *guard = None;
                drop(guard);
                self.release_if_idle(key, &slot);
                Err(e)
            }
        }
    }

    /// Drop the slot for `key` unless a lookup is queued on it
    fn release_if_idle(&self, key: &str, slot: &Slot<V>) {
        let mut map = self.map();
        let idle = map
            .get(key)
            // One reference in the map, one held by the caller
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2);
        if idle {
            map.remove(key);
        }
    }

    /// Evict one key regardless of its age
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.map().remove(key).is_some();
        debug!(key, removed, "Invalidated cache entry");
        removed
    }

    /// Evict every key matching `predicate`
    pub fn invalidate_where(&self, predicate: impl Fn(&str) -> bool) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|key, _| !predicate(key));
        let count = before - map.len();
        debug!(count, "Invalidated matching cache entries");
        count
    }

    /// Evict every key
    pub fn invalidate_all(&self) -> usize {
        let mut map = self.map();
        let count = map.len();
        map.clear();
        debug!(count, "Invalidated all cache entries");
        count
    }

    /// Snapshot of the value stored for `key`, fresh or not
    ///
    /// Waits for an in-flight computation on the same key.
    pub async fn peek(&self, key: &str) -> Option<CacheSnapshot<V>> {
        let slot = self.map().get(key).cloned()?;
        let guard = slot.lock().await;
        guard.as_ref().map(|entry| {
            let age = entry.created.elapsed();
            CacheSnapshot {
                value: entry.value.clone(),
                age,
                resolved_at: entry.resolved_at,
                fresh: age < self.ttl,
            }
        })
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .map()
            .values()
            // A slot locked by an in-flight computation counts as occupied
            .filter(|slot| {
                slot.try_lock()
                    .map(|g| g.as_ref().is_some_and(|e| e.created.elapsed() < self.ttl))
                    .unwrap_or(true)
            })
            .count();

        CacheStats {
            entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
        }
    }

    fn slot(&self, key: &str) -> Slot<V> {
        let mut map = self.map();
        if let Some(slot) = map.get(key) {
            return slot.clone();
        }

        let ttl = self.ttl;
        let before = map.len();
        map.retain(|_, slot| {
            // Someone else holds it: leave it alone
            Arc::strong_count(slot) > 1
                || slot
                    .try_lock()
                    .map(|g| g.as_ref().is_some_and(|e| e.created.elapsed() < ttl))
                    .unwrap_or(true)
        });
        let pruned = before - map.len();
        if pruned > 0 {
            trace!(pruned, "Pruned expired cache slots");
        }

        let slot: Slot<V> = Arc::new(tokio::sync::Mutex::new(None));
        map.insert(key.to_string(), slot.clone());
        slot
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Slot<V>>> {
        // The map holds no invariants a panicking holder could break
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
