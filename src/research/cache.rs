//! TTL caching for provider facets and fused products.
//!
//! A thin wrapper over an async cache that stores a per-entry TTL with each
//! value and collapses concurrent misses for one key into a single fetch.

use moka::future::Cache;
use moka::Expiry;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// One stored value together with the TTL it was inserted with.
#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    ttl: Duration,
}

/// Expiry policy reading the TTL recorded in each slot.
///
/// Overwrites reset the clock: an entry always lives `ttl` from its most
/// recent insert.
struct SlotExpiry;

impl<K, V> Expiry<K, Slot<V>> for SlotExpiry {
    fn expire_after_create(
        &self,
        _key: &K,
        slot: &Slot<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(slot.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        slot: &Slot<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(slot.ttl)
    }
}

/// Key-value store with absolute expiration per entry.
///
/// Misses are normal return values, never errors. Eviction of stale entries
/// is lazy; [`FacetCache::entry_count`] therefore over-approximates the
/// number of live entries.
#[derive(Clone)]
pub struct FacetCache<V> {
    entries: Cache<String, Slot<V>>,
    default_ttl: Duration,
}

impl<V> FacetCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache bounded to `max_entries` with the given default TTL.
    pub fn new(max_entries: u64, default_ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(SlotExpiry)
            .build();
        Self {
            entries,
            default_ttl,
        }
    }

    /// Returns the stored value when present and not yet expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).await.map(|slot| slot.value)
    }

    /// Store a value under the default TTL, replacing any existing entry.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store a value with an explicit TTL, replacing any existing entry.
    pub async fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(key.into(), Slot { value, ttl }).await;
    }

    /// Return the cached value for `key`, or run `fetch` to produce one.
    ///
    /// Concurrent callers missing on the same key share a single in-flight
    /// fetch. A fetch returning `None` caches nothing, so the next caller
    /// retries upstream.
    pub async fn get_or_fetch<F>(&self, key: &str, ttl: Duration, fetch: F) -> Option<V>
    where
        F: Future<Output = Option<V>>,
    {
        self.entries
            .optionally_get_with(key.to_string(), async move {
                debug!(key, "cache miss, fetching upstream");
                fetch.await.map(|value| Slot { value, ttl })
            })
            .await
            .map(|slot| slot.value)
    }

    /// Like [`FacetCache::get_or_fetch`] for loaders that always produce a
    /// value.
    pub async fn get_or_compute<F>(&self, key: &str, ttl: Duration, compute: F) -> V
    where
        F: Future<Output = V>,
    {
        self.entries
            .get_with(key.to_string(), async move {
                let value = compute.await;
                Slot { value, ttl }
            })
            .await
            .value
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of entries currently stored, including expired entries not yet
    /// evicted.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Run pending cache maintenance so counts reflect recent activity.
    pub async fn sync(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// The TTL applied when none is given explicitly.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}
