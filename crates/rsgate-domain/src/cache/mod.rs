//! Security data caches.
//!
//! Two process-wide caches back the permission evaluator:
//!
//! - [`MembershipCache`]: user → groups. Cleared per user on logout.
//! - [`GrantCache`]: (group, permission) → granted. Keyed by group rather
//!   than by user, so its size is bounded by groups × permissions and a
//!   grant change is one invalidation no matter how many members the group
//!   has. Survives logout.
//!
//! # Consistency
//!
//! Neither cache expires entries by time. Correctness depends on explicit
//! invalidation, which is race-free against in-flight fetches: a fetch that
//! started before an invalidation of its key cannot populate the cache
//! afterwards (see `store.rs`). Capacity eviction only causes a refetch.
//!
//! Concurrent misses on one key share a single fetch (singleflight).
//! Failed fetches are never cached.
//!
//! # Example
//!
//! ```rust,ignore
//! use rsgate_domain::cache::{CacheConfig, GrantCache, MembershipCache};
//!
//! let config = CacheConfig::default();
//! let memberships = Arc::new(MembershipCache::new(&config));
//! let grants = Arc::new(GrantCache::new(&config));
//! ```

mod grant;
mod membership;
mod singleflight;
mod store;

pub use grant::GrantCache;
pub use membership::MembershipCache;
pub use store::{CacheMetrics, CacheMetricsSnapshot};

/// Configuration for the security caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of users whose memberships are cached.
    pub membership_capacity: u64,
    /// Maximum number of (group, permission) pairs cached.
    pub grant_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            membership_capacity: 100_000,
            grant_capacity: 100_000,
        }
    }
}

impl CacheConfig {
    /// Sets the membership cache capacity.
    pub fn with_membership_capacity(mut self, capacity: u64) -> Self {
        self.membership_capacity = capacity;
        self
    }

    /// Sets the grant cache capacity.
    pub fn with_grant_capacity(mut self, capacity: u64) -> Self {
        self.grant_capacity = capacity;
        self
    }
}

/// Registers cache metric descriptions.
///
/// Call once during application startup, after a metrics recorder has been
/// installed. Optional: the counters work without descriptions.
///
/// # Metrics Registered
///
/// - `rsgate_cache_hits_total{cache}` - Lookups answered from cache
/// - `rsgate_cache_misses_total{cache}` - Lookups that missed
/// - `rsgate_stale_fetches_discarded_total{cache}` - Fetches invalidated mid-flight
/// - `rsgate_lookup_failures_total` - Checks denied because of a lookup failure
pub fn register_cache_metrics() {
    metrics::describe_counter!(
        "rsgate_cache_hits_total",
        "Total number of security cache hits"
    );
    metrics::describe_counter!(
        "rsgate_cache_misses_total",
        "Total number of security cache misses"
    );
    metrics::describe_counter!(
        "rsgate_stale_fetches_discarded_total",
        "Fetch results discarded because the key was invalidated while in flight"
    );
    metrics::describe_counter!(
        "rsgate_lookup_failures_total",
        "Permission checks denied because security data could not be read"
    );
}
