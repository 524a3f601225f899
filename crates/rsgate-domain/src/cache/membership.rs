//! User → security group cache.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::error::LookupResult;
use crate::model::{GroupSet, UserIdentity};

use super::store::{CacheMetrics, GenerationalCache};
use super::CacheConfig;

/// Cached group memberships, keyed by user.
///
/// An empty set is a valid cached answer (a user with no groups) and is not
/// refetched. Entries live until [`MembershipCache::invalidate`] is called
/// for the user, normally on logout.
pub struct MembershipCache {
    inner: GenerationalCache<UserIdentity, Arc<GroupSet>>,
}

impl std::fmt::Debug for MembershipCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipCache")
            .field("entry_count", &self.inner.entry_count())
            .field("in_flight", &self.inner.in_flight())
            .field("pending_fetches", &self.inner.tracked_keys())
            .finish()
    }
}

impl MembershipCache {
    /// Creates an empty membership cache.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: GenerationalCache::new("membership", config.membership_capacity),
        }
    }

    /// Returns the cached groups of `user`, if present.
    pub fn get(&self, user: &UserIdentity) -> Option<Arc<GroupSet>> {
        self.inner.get(user)
    }

    /// Returns the groups of `user`, calling `fetch` on a miss.
    ///
    /// Concurrent callers for the same user share one `fetch`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        user: &UserIdentity,
        fetch: F,
    ) -> LookupResult<Arc<GroupSet>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = LookupResult<Arc<GroupSet>>>,
    {
        self.inner.get_or_fetch(user, fetch).await
    }

    /// Drops the cached groups of `user`.
    ///
    /// Idempotent. Any fetch for this user already in flight will not
    /// populate the cache, and calls starting after this returns refetch.
    pub fn invalidate(&self, user: &UserIdentity) {
        debug!(user = %user, "invalidating cached memberships");
        self.inner.invalidate(user);
    }

    /// Drops every cached membership.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Returns the approximate number of cached users.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Returns the number of users with a membership fetch running.
    pub fn pending_fetches(&self) -> usize {
        self.inner.tracked_keys()
    }

    /// Returns the in-process counters for this cache.
    pub fn metrics(&self) -> &CacheMetrics {
        self.inner.metrics()
    }
}
