//! Generation-guarded read-through cache.
//!
//! Both security caches share this core. While a fetch for a key is in
//! flight the key is tracked with an invalidation counter; invalidating the
//! key bumps that counter under the key's shard lock. A fetch records the
//! counter it started under and may only populate the cache if it is still
//! current. A fetch that loses that race still answers its own callers but
//! never resurrects data that was invalidated while it was in flight.
//!
//! A key is tracked only while fetches for it are running, so the tracking
//! map is bounded by concurrent fetches rather than by keys ever seen.
//! Invalidating a key nobody is fetching only removes the cached value.
//!
//! `invalidate_all` bumps a cache-wide epoch instead of touching every key.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use moka::sync::Cache;
use tracing::debug;

use crate::error::LookupResult;

use super::singleflight::{Singleflight, SingleflightGuard, SingleflightSlot};

/// The (epoch, generation) pair a fetch started under.
///
/// `generation` is the key's invalidation counter, 0 when the key is not
/// tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Stamp {
    epoch: u64,
    generation: u64,
}

/// Counters for cache behavior, kept in-process for diagnostics and tests.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookups answered from the cache.
    pub hits: AtomicU64,
    /// Lookups that missed the cache.
    pub misses: AtomicU64,
    /// Fetches actually sent to the persistence collaborator.
    pub fetches: AtomicU64,
    /// Fetches that failed and were not cached.
    pub failures: AtomicU64,
    /// Fetch results dropped because the key was invalidated mid-flight.
    pub stale_discards: AtomicU64,
}

impl CacheMetrics {
    /// Returns a snapshot of the current metrics.
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            stale_discards: self.stale_discards.load(Ordering::Relaxed),
        }
    }

    /// Returns the cache hit ratio (hits / (hits + misses)).
    /// Returns 0.0 if no hits or misses have occurred.
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// A point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub failures: u64,
    pub stale_discards: u64,
}

#[derive(Debug, Default)]
struct KeyTrack {
    /// Invalidations seen while tracked.
    generation: u64,
    /// Fetches running for the key.
    fetching: usize,
}

pub(crate) struct GenerationalCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Metric label, "membership" or "grant".
    name: &'static str,
    entries: Cache<K, V>,
    /// Keys with at least one fetch running.
    tracked: DashMap<K, KeyTrack>,
    epoch: RwLock<u64>,
    in_flight: Singleflight<(K, Stamp), LookupResult<V>>,
    metrics: CacheMetrics,
}

impl<K, V> GenerationalCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: &'static str, max_capacity: u64) -> Self {
        Self {
            name,
            entries: Cache::builder().max_capacity(max_capacity).build(),
            tracked: DashMap::new(),
            epoch: RwLock::new(0),
            in_flight: Singleflight::new(),
            metrics: CacheMetrics::default(),
        }
    }

    pub(crate) fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key)
    }

    pub(crate) fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of keys with invalidation bookkeeping, i.e. with a fetch running.
    pub(crate) fn tracked_keys(&self) -> usize {
        self.tracked.len()
    }

    /// Returns the cached value or fetches it, with at most one fetch per key
    /// in flight. Failures are returned to every waiter and never cached.
    pub(crate) async fn get_or_fetch<F, Fut>(&self, key: &K, fetch: F) -> LookupResult<V>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = LookupResult<V>>,
    {
        if let Some(value) = self.entries.get(key) {
            self.record_hit();
            return Ok(value);
        }
        self.record_miss();

        loop {
            let stamp = self.stamp(key);
            let flight_key = (key.clone(), stamp);

            match self.in_flight.acquire(flight_key.clone()) {
                SingleflightSlot::Follower(mut receiver) => match receiver.recv().await {
                    Ok(result) => return result,
                    // Leader went away without publishing; its guard freed the
                    // slot, so try again (possibly as the new leader).
                    Err(_) => continue,
                },
                SingleflightSlot::Leader(sender) => {
                    let slot = SingleflightGuard::new(&self.in_flight, flight_key);

                    // A previous leader may have filled the cache between our
                    // miss and acquiring the slot.
                    if let Some(value) = self.entries.get(key) {
                        let _ = sender.send(Ok(value.clone()));
                        slot.complete();
                        return Ok(value);
                    }

                    let ticket = self.begin_fetch(key);
                    self.metrics.fetches.fetch_add(1, Ordering::Relaxed);
                    let result = fetch().await;

                    // Free the slot first so no later lookup joins a flight
                    // whose key is no longer tracked.
                    slot.complete();
                    match &result {
                        Ok(value) => {
                            if !ticket.finish(Some(value.clone())) {
                                self.metrics.stale_discards.fetch_add(1, Ordering::Relaxed);
                                metrics::counter!(
                                    "rsgate_stale_fetches_discarded_total",
                                    "cache" => self.name
                                )
                                .increment(1);
                                debug!(
                                    cache = self.name,
                                    "discarded fetch result invalidated mid-flight"
                                );
                            }
                        }
                        Err(_) => {
                            ticket.finish(None);
                            self.metrics.failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }

                    // No receivers is fine.
                    let _ = sender.send(result.clone());
                    return result;
                }
            }
        }
    }

    /// Removes `key` and makes every fetch already in flight for it stale.
    pub(crate) fn invalidate(&self, key: &K) {
        let mut track = self.tracked.get_mut(key);
        if let Some(track) = track.as_mut() {
            track.generation += 1;
        }
        self.entries.invalidate(key);
        drop(track);
    }

    /// Removes everything and makes every fetch in flight stale.
    pub(crate) fn invalidate_all(&self) {
        let mut epoch = self.epoch.write().unwrap_or_else(PoisonError::into_inner);
        *epoch += 1;
        self.entries.invalidate_all();
    }

    fn epoch(&self) -> u64 {
        *self.epoch.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn stamp(&self, key: &K) -> Stamp {
        Stamp {
            epoch: self.epoch(),
            generation: self.tracked.get(key).map(|t| t.generation).unwrap_or(0),
        }
    }

    /// Tracks `key` for the duration of one fetch.
    fn begin_fetch<'a>(&'a self, key: &K) -> FetchTicket<'a, K, V> {
        let epoch = self.epoch();
        let mut track = self.tracked.entry(key.clone()).or_default();
        track.fetching += 1;
        let stamp = Stamp {
            epoch,
            generation: track.generation,
        };
        drop(track);
        FetchTicket {
            cache: self,
            key: key.clone(),
            stamp,
            finished: false,
        }
    }

    /// Ends one fetch of `key`, inserting `value` only if neither the key nor
    /// the cache was invalidated since `stamp` was taken. Holds the epoch
    /// read lock and the key's shard lock so the check and the insert are
    /// atomic against invalidation. Returns whether the stamp was current.
    fn end_fetch(&self, key: &K, stamp: Stamp, value: Option<V>) -> bool {
        let epoch = self.epoch.read().unwrap_or_else(PoisonError::into_inner);
        let Entry::Occupied(mut track) = self.tracked.entry(key.clone()) else {
            return false;
        };

        let current = *epoch == stamp.epoch && track.get().generation == stamp.generation;
        if current {
            if let Some(value) = value {
                self.entries.insert(key.clone(), value);
            }
        }

        let track_mut = track.get_mut();
        track_mut.fetching = track_mut.fetching.saturating_sub(1);
        if track_mut.fetching == 0 {
            track.remove();
        }
        current
    }

    fn record_hit(&self) {
        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("rsgate_cache_hits_total", "cache" => self.name).increment(1);
    }

    fn record_miss(&self) {
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("rsgate_cache_misses_total", "cache" => self.name).increment(1);
    }
}

/// One running fetch. Dropping it unfinished (cancelled leader) still
/// releases the key's tracking.
struct FetchTicket<'a, K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: &'a GenerationalCache<K, V>,
    key: K,
    stamp: Stamp,
    finished: bool,
}

impl<K, V> FetchTicket<'_, K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn finish(mut self, value: Option<V>) -> bool {
        self.finished = true;
        self.cache.end_fetch(&self.key, self.stamp, value)
    }
}

impl<K, V> Drop for FetchTicket<'_, K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.finished {
            self.cache.end_fetch(&self.key, self.stamp, None);
        }
    }
}
