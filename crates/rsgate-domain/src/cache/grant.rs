//! (group, permission) → granted cache.

use std::collections::HashSet;
use std::future::Future;

use dashmap::DashMap;
use tracing::debug;

use crate::error::LookupResult;
use crate::model::{GroupId, Permission};

use super::store::{CacheMetrics, GenerationalCache};
use super::CacheConfig;

type GrantKey = (GroupId, Permission);

/// Cached group grants, keyed by (group, permission).
///
/// Negative answers are cached too, so a permission no group holds is only
/// looked up once per group until invalidated.
///
/// Keeps a secondary index from group to the permissions looked up for it,
/// so [`GrantCache::invalidate_group`] is O(K) in that group's pairs rather
/// than a scan of the whole cache.
pub struct GrantCache {
    inner: GenerationalCache<GrantKey, bool>,
    by_group: DashMap<GroupId, HashSet<Permission>>,
}

impl std::fmt::Debug for GrantCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantCache")
            .field("entry_count", &self.inner.entry_count())
            .field("in_flight", &self.inner.in_flight())
            .field("group_index_size", &self.by_group.len())
            .finish()
    }
}

impl GrantCache {
    /// Creates an empty grant cache.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: GenerationalCache::new("grant", config.grant_capacity),
            by_group: DashMap::new(),
        }
    }

    /// Returns the cached answer for the pair, if present.
    pub fn get(&self, group: &GroupId, permission: &Permission) -> Option<bool> {
        self.inner.get(&(group.clone(), permission.clone()))
    }

    /// Returns whether `group` grants `permission`, calling `fetch` on a miss.
    ///
    /// Concurrent callers for the same pair share one `fetch`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        group: &GroupId,
        permission: &Permission,
        fetch: F,
    ) -> LookupResult<bool>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = LookupResult<bool>>,
    {
        // Indexed before the fetch so a concurrent invalidate_group bumps the
        // pair, and again after it in case that invalidation dropped the index.
        self.index(group, permission);
        let key = (group.clone(), permission.clone());
        let result = self.inner.get_or_fetch(&key, fetch).await;
        if result.is_ok() {
            self.index(group, permission);
        }
        result
    }

    fn index(&self, group: &GroupId, permission: &Permission) {
        let indexed = self
            .by_group
            .get(group)
            .is_some_and(|permissions| permissions.contains(permission));
        if !indexed {
            self.by_group
                .entry(group.clone())
                .or_default()
                .insert(permission.clone());
        }
    }

    /// Drops the cached answer for one pair.
    pub fn invalidate(&self, group: &GroupId, permission: &Permission) {
        debug!(group = %group, permission = %permission, "invalidating cached grant");
        // The index entry stays; a concurrent fetch may still store the pair.
        self.inner.invalidate(&(group.clone(), permission.clone()));
    }

    /// Drops every cached answer for `group`.
    pub fn invalidate_group(&self, group: &GroupId) {
        debug!(group = %group, "invalidating cached grants for group");
        // Atomic remove() so no concurrent insert can slip between read and removal.
        if let Some((_, permissions)) = self.by_group.remove(group) {
            for permission in permissions {
                self.inner.invalidate(&(group.clone(), permission));
            }
        }
    }

    /// Drops every cached answer.
    pub fn invalidate_all(&self) {
        self.by_group.clear();
        self.inner.invalidate_all();
    }

    /// Returns the approximate number of cached pairs.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Returns the in-process counters for this cache.
    pub fn metrics(&self) -> &CacheMetrics {
        self.inner.metrics()
    }
}
