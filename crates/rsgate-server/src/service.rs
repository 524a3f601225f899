//! Process-wide security service.
//!
//! [`SecurityService`] is created once at startup and shared. It owns the
//! store, both caches and the evaluator, and is the one place where
//! administrative writes meet cache invalidation: every mutation writes
//! through the store first and then invalidates exactly the cache entries
//! it affected.
//!
//! | Mutation                | Invalidated               |
//! |-------------------------|---------------------------|
//! | membership add/remove   | that user's memberships   |
//! | grant add/remove        | that (group, permission)  |
//! | role binding add/remove | nothing (never cached)    |

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use rsgate_domain::cache::register_cache_metrics;
use rsgate_domain::error::DomainResult;
use rsgate_domain::evaluator::{PermissionEvaluator, RoleSelector, SessionSecurity};
use rsgate_domain::model::{GroupId, GroupSet, Permission, RoleTypeId, UserIdentity};
use rsgate_domain::{GrantCache, MembershipCache};
use rsgate_storage::{MemoryStore, RoleBindingKey, SecurityStore, StorageError};

use crate::adapters::StoreReader;
use crate::config::{ConfigLoadError, SecurityConfig};
use crate::session::{AttributeIdentityAdapter, SessionAttributes};

/// Errors from building the service or from administrative mutations.
///
/// Permission checks never fail with this type; they deny instead.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error("security store operation failed: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// The security service over an in-memory store.
pub type MemorySecurityService = SecurityService<MemoryStore>;

/// Permission checks, logout and administration over one store.
pub struct SecurityService<S: SecurityStore> {
    store: Arc<S>,
    evaluator: Arc<PermissionEvaluator<StoreReader<S>>>,
    sessions: SessionSecurity<StoreReader<S>, AttributeIdentityAdapter>,
    identity_attribute: String,
}

impl SecurityService<MemoryStore> {
    /// Builds the service for the backend named in `config`.
    pub fn from_config(config: &SecurityConfig) -> ServiceResult<Self> {
        Self::with_store(MemoryStore::new_shared(), config)
    }
}

impl<S: SecurityStore> SecurityService<S> {
    /// Builds the service over an existing store.
    pub fn with_store(store: Arc<S>, config: &SecurityConfig) -> ServiceResult<Self> {
        config.validate()?;
        register_cache_metrics();

        let cache_config = config.cache_config();
        let evaluator = Arc::new(PermissionEvaluator::with_config(
            Arc::new(StoreReader::new(Arc::clone(&store))),
            Arc::new(MembershipCache::new(&cache_config)),
            Arc::new(GrantCache::new(&cache_config)),
            config.evaluator_config(),
        ));

        let identity_attribute = config.session.identity_attribute.clone();
        let sessions = SessionSecurity::new(
            Arc::clone(&evaluator),
            AttributeIdentityAdapter::new(identity_attribute.clone()),
        );

        info!(
            backend = %config.storage.backend,
            membership_capacity = cache_config.membership_capacity,
            grant_capacity = cache_config.grant_capacity,
            "security service initialized"
        );

        Ok(Self {
            store,
            evaluator,
            sessions,
            identity_attribute,
        })
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The shared evaluator, for identity-based checks and cache access.
    pub fn evaluator(&self) -> &Arc<PermissionEvaluator<StoreReader<S>>> {
        &self.evaluator
    }

    /// Session-based checks resolving identity through the configured attribute.
    pub fn sessions(&self) -> &SessionSecurity<StoreReader<S>, AttributeIdentityAdapter> {
        &self.sessions
    }

    // ------------------------------------------------------------------
    // Session-based checks
    // ------------------------------------------------------------------

    /// Whether the session's user holds `permission` through any group.
    pub async fn has_permission(
        &self,
        permission: &Permission,
        session: &SessionAttributes,
    ) -> bool {
        self.sessions.has_permission(permission, session).await
    }

    /// Whether the session's user holds `entity` + `action` or the entity's
    /// admin alias.
    pub async fn has_entity_permission(
        &self,
        entity: &str,
        action: &str,
        session: &SessionAttributes,
    ) -> bool {
        self.sessions
            .has_entity_permission(entity, action, session)
            .await
    }

    /// Entity check, then one of `roles` bound to the session's user on the
    /// record `primary_key`.
    pub async fn has_role_permission(
        &self,
        application: &str,
        action: &str,
        primary_key: &str,
        roles: &RoleSelector,
        session: &SessionAttributes,
    ) -> bool {
        self.sessions
            .has_role_permission(application, action, primary_key, roles, session)
            .await
    }

    // ------------------------------------------------------------------
    // Identity-based checks
    // ------------------------------------------------------------------

    /// [`has_permission`](Self::has_permission) for a known identity.
    pub async fn user_has_permission(&self, permission: &Permission, user: &UserIdentity) -> bool {
        self.evaluator.has_permission(permission, user).await
    }

    /// [`has_entity_permission`](Self::has_entity_permission) for a known identity.
    pub async fn user_has_entity_permission(
        &self,
        entity: &str,
        action: &str,
        user: &UserIdentity,
    ) -> bool {
        self.evaluator
            .has_entity_permission(entity, action, user)
            .await
    }

    /// [`has_role_permission`](Self::has_role_permission) for a known identity.
    pub async fn user_has_role_permission(
        &self,
        application: &str,
        action: &str,
        primary_key: &str,
        roles: &RoleSelector,
        user: &UserIdentity,
    ) -> bool {
        self.evaluator
            .has_role_permission(application, action, primary_key, roles, user)
            .await
    }

    /// Returns the security groups of `user`.
    pub async fn security_groups(&self, user: &UserIdentity) -> DomainResult<Arc<GroupSet>> {
        Ok(self.evaluator.groups_of(user).await?)
    }

    /// Returns whether `group` has been granted `permission`.
    pub async fn group_has_permission(
        &self,
        group: &GroupId,
        permission: &Permission,
    ) -> DomainResult<bool> {
        Ok(self.evaluator.grants(group, permission).await?)
    }

    // ------------------------------------------------------------------
    // Logout & invalidation
    // ------------------------------------------------------------------

    /// Logs the session out: clears the user's cached data and removes the
    /// identity from the session. Returns who was logged out, if anyone.
    pub fn logout(&self, session: &mut SessionAttributes) -> Option<UserIdentity> {
        let user = self.sessions.identity_of(session).ok();
        if let Some(user) = &user {
            self.evaluator.clear_user_data(user);
        }
        session.remove(&self.identity_attribute);
        user
    }

    /// Clears cached data for `user`.
    pub fn clear_user_data(&self, user: &UserIdentity) {
        self.evaluator.clear_user_data(user);
    }

    /// Drops every cached grant answer for `group`, for grants changed
    /// outside this service.
    pub fn refresh_group(&self, group: &GroupId) {
        self.evaluator.grant_cache().invalidate_group(group);
        info!(group = %group, "refreshed cached group grants");
    }

    /// Drops everything from both caches.
    pub fn invalidate_all(&self) {
        self.evaluator.membership_cache().invalidate_all();
        self.evaluator.grant_cache().invalidate_all();
        info!("cleared all cached security data");
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Adds `user` to `group` and drops the user's cached memberships.
    pub async fn add_membership(&self, user: &UserIdentity, group: &GroupId) -> ServiceResult<()> {
        self.store
            .add_membership(user.as_str(), group.as_str())
            .await?;
        self.evaluator.membership_cache().invalidate(user);
        info!(user = %user, group = %group, "added group membership");
        Ok(())
    }

    /// Removes `user` from `group` and drops the user's cached memberships.
    /// Returns whether the membership existed.
    pub async fn remove_membership(
        &self,
        user: &UserIdentity,
        group: &GroupId,
    ) -> ServiceResult<bool> {
        let removed = self
            .store
            .remove_membership(user.as_str(), group.as_str())
            .await?;
        self.evaluator.membership_cache().invalidate(user);
        info!(user = %user, group = %group, removed, "removed group membership");
        Ok(removed)
    }

    /// Grants `permission` to `group` and drops that pair's cached answer.
    pub async fn add_grant(&self, group: &GroupId, permission: &Permission) -> ServiceResult<()> {
        self.store
            .add_grant(group.as_str(), permission.as_str())
            .await?;
        self.evaluator.grant_cache().invalidate(group, permission);
        info!(group = %group, permission = %permission, "granted permission");
        Ok(())
    }

    /// Revokes `permission` from `group` and drops that pair's cached answer.
    /// Returns whether the grant existed.
    pub async fn remove_grant(
        &self,
        group: &GroupId,
        permission: &Permission,
    ) -> ServiceResult<bool> {
        let removed = self
            .store
            .remove_grant(group.as_str(), permission.as_str())
            .await?;
        self.evaluator.grant_cache().invalidate(group, permission);
        info!(group = %group, permission = %permission, removed, "revoked permission");
        Ok(removed)
    }

    /// Binds `role` to `user` on one record. Role bindings are read uncached,
    /// so the change is visible to the next check.
    pub async fn add_role_binding(
        &self,
        application: &str,
        primary_key: &str,
        user: &UserIdentity,
        role: &RoleTypeId,
    ) -> ServiceResult<()> {
        let key = RoleBindingKey::new(application, primary_key, user.as_str());
        self.store.add_role_binding(&key, role.as_str()).await?;
        info!(application, primary_key, user = %user, role = %role, "added role binding");
        Ok(())
    }

    /// Unbinds `role` from `user` on one record. Returns whether it was bound.
    pub async fn remove_role_binding(
        &self,
        application: &str,
        primary_key: &str,
        user: &UserIdentity,
        role: &RoleTypeId,
    ) -> ServiceResult<bool> {
        let key = RoleBindingKey::new(application, primary_key, user.as_str());
        let removed = self.store.remove_role_binding(&key, role.as_str()).await?;
        info!(
            application,
            primary_key,
            user = %user,
            role = %role,
            removed,
            "removed role binding"
        );
        Ok(removed)
    }
}
