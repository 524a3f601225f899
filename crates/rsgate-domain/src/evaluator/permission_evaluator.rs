//! Permission evaluator.
//!
//! Composes the membership and grant caches into permission checks.
//!
//! # Evaluation
//!
//! - **Direct**: the user's groups are checked concurrently with
//!   `FuturesUnordered`, short-circuiting on the first group that grants the
//!   permission. A lookup failure on one group does not hide a grant found on
//!   another; it only matters when no group grants.
//! - **Entity**: the direct permission first, then the admin alias. The alias
//!   is always tried when the direct check did not succeed.
//! - **Role-scoped**: the entity check gates the role lookup. Role bindings
//!   are record-level and are read uncached on every check that gets there.
//!
//! # Timeouts
//!
//! Every persistence fetch is bounded by `EvaluatorConfig::fetch_timeout`;
//! a timeout is a `LookupFailure` like any other.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cache::{GrantCache, MembershipCache};
use crate::error::{DomainError, DomainResult, LookupFailure, LookupResult};
use crate::model::{GroupId, GroupSet, Permission, UserIdentity};

use super::config::EvaluatorConfig;
use super::traits::PermissionReader;
use super::types::RoleSelector;

/// Answers permission questions for users.
///
/// The caches are process-wide state owned by the caller and shared in via
/// `Arc`, so several evaluators (or a restarted one) see the same cached data
/// and logout invalidation reaches all of them.
pub struct PermissionEvaluator<R> {
    reader: Arc<R>,
    membership_cache: Arc<MembershipCache>,
    grant_cache: Arc<GrantCache>,
    config: EvaluatorConfig,
}

impl<R> std::fmt::Debug for PermissionEvaluator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionEvaluator")
            .field("membership_cache", &self.membership_cache)
            .field("grant_cache", &self.grant_cache)
            .field("config", &self.config)
            .finish()
    }
}

impl<R> PermissionEvaluator<R>
where
    R: PermissionReader + 'static,
{
    /// Creates an evaluator with the default configuration.
    pub fn new(
        reader: Arc<R>,
        membership_cache: Arc<MembershipCache>,
        grant_cache: Arc<GrantCache>,
    ) -> Self {
        Self::with_config(
            reader,
            membership_cache,
            grant_cache,
            EvaluatorConfig::default(),
        )
    }

    /// Creates an evaluator with a custom configuration.
    pub fn with_config(
        reader: Arc<R>,
        membership_cache: Arc<MembershipCache>,
        grant_cache: Arc<GrantCache>,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            reader,
            membership_cache,
            grant_cache,
            config,
        }
    }

    /// Returns the evaluator configuration.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Returns the shared membership cache.
    pub fn membership_cache(&self) -> &Arc<MembershipCache> {
        &self.membership_cache
    }

    /// Returns the shared grant cache.
    pub fn grant_cache(&self) -> &Arc<GrantCache> {
        &self.grant_cache
    }

    /// Returns the security groups of `user`, from cache when possible.
    pub async fn groups_of(&self, user: &UserIdentity) -> LookupResult<Arc<GroupSet>> {
        self.membership_cache
            .get_or_fetch(user, || async move {
                let groups = self.bounded(self.reader.find_memberships(user)).await?;
                debug!(user = %user, groups = groups.len(), "fetched group memberships");
                Ok(Arc::new(groups))
            })
            .await
    }

    /// Returns whether `group` grants `permission`, from cache when possible.
    pub async fn grants(&self, group: &GroupId, permission: &Permission) -> LookupResult<bool> {
        self.grant_cache
            .get_or_fetch(group, permission, || async move {
                self.bounded(self.reader.find_grant(group, permission))
                    .await
            })
            .await
    }

    /// Checks whether `user` holds `permission` through any of their groups.
    pub async fn try_has_permission(
        &self,
        permission: &Permission,
        user: &UserIdentity,
    ) -> DomainResult<bool> {
        let groups = self.groups_of(user).await?;

        let mut checks: FuturesUnordered<_> = groups
            .iter()
            .map(|group| self.grants(group, permission))
            .collect();

        let mut failure: Option<LookupFailure> = None;
        while let Some(result) = checks.next().await {
            match result {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(false),
        }
    }

    /// Fail-closed form of [`try_has_permission`](Self::try_has_permission).
    pub async fn has_permission(&self, permission: &Permission, user: &UserIdentity) -> bool {
        let result = self.try_has_permission(permission, user).await;
        fail_closed(result, "permission", user)
    }

    /// Checks `action` on `entity`, falling back to the entity's admin alias.
    pub async fn try_has_entity_permission(
        &self,
        entity: &str,
        action: &str,
        user: &UserIdentity,
    ) -> DomainResult<bool> {
        let convention = &self.config.convention;
        let direct = convention.entity_permission(entity, action)?;

        let direct_result = self.try_has_permission(&direct, user).await;
        if matches!(direct_result, Ok(true)) {
            return Ok(true);
        }

        let Some(admin) = convention.admin_permission(entity)? else {
            return direct_result;
        };

        match self.try_has_permission(&admin, user).await {
            Ok(true) => Ok(true),
            Ok(false) => direct_result,
            // Keep the direct failure if there was one.
            Err(e) => direct_result.and(Err(e)),
        }
    }

    /// Fail-closed form of
    /// [`try_has_entity_permission`](Self::try_has_entity_permission).
    pub async fn has_entity_permission(
        &self,
        entity: &str,
        action: &str,
        user: &UserIdentity,
    ) -> bool {
        let result = self.try_has_entity_permission(entity, action, user).await;
        fail_closed(result, "entity permission", user)
    }

    /// Checks the entity permission for `application`/`action`, then that
    /// `user` holds one of `roles` on the record `primary_key`.
    ///
    /// Role bindings are only read once the entity check has passed. An empty
    /// `roles` matches no binding and denies.
    pub async fn try_has_role_permission(
        &self,
        application: &str,
        action: &str,
        primary_key: &str,
        roles: &RoleSelector,
        user: &UserIdentity,
    ) -> DomainResult<bool> {
        if !self
            .try_has_entity_permission(application, action, user)
            .await?
        {
            return Ok(false);
        }

        if roles.is_empty() {
            return Ok(false);
        }

        let bound = self
            .bounded(
                self.reader
                    .find_role_bindings(application, primary_key, user),
            )
            .await?;

        Ok(roles.roles().iter().any(|role| bound.contains(role)))
    }

    /// Fail-closed form of
    /// [`try_has_role_permission`](Self::try_has_role_permission).
    pub async fn has_role_permission(
        &self,
        application: &str,
        action: &str,
        primary_key: &str,
        roles: &RoleSelector,
        user: &UserIdentity,
    ) -> bool {
        let result = self
            .try_has_role_permission(application, action, primary_key, roles, user)
            .await;
        fail_closed(result, "role permission", user)
    }

    /// Clears cached data for `user`; called on logout.
    ///
    /// Only the user's memberships are dropped. Group grants are shared by
    /// every member and stay cached. Idempotent.
    pub fn clear_user_data(&self, user: &UserIdentity) {
        self.membership_cache.invalidate(user);
        info!(user = %user, "cleared cached user data");
    }

    async fn bounded<T>(&self, fetch: impl Future<Output = LookupResult<T>>) -> LookupResult<T> {
        match timeout(self.config.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(LookupFailure::Timeout {
                duration_ms: u64::try_from(self.config.fetch_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            }),
        }
    }
}

/// Collapses a check result to a boolean, denying on any error.
fn fail_closed(result: DomainResult<bool>, check: &'static str, user: &UserIdentity) -> bool {
    match result {
        Ok(allowed) => allowed,
        Err(DomainError::LookupFailure(failure)) => {
            metrics::counter!("rsgate_lookup_failures_total").increment(1);
            warn!(
                check,
                user = %user,
                error = %failure,
                "security data unavailable, denying"
            );
            false
        }
        Err(e) => {
            debug!(check, user = %user, error = %e, "check rejected, denying");
            false
        }
    }
}
