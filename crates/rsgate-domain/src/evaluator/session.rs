//! Session-based entry points.
//!
//! Thin wrappers: resolve the identity through the adapter, then call the
//! identity-based primitive. An anonymous session is denied, never an error
//! in the boolean forms.

use std::sync::Arc;

use tracing::debug;

use crate::error::{DomainError, DomainResult};
use crate::model::{Permission, UserIdentity};

use super::permission_evaluator::PermissionEvaluator;
use super::traits::{PermissionReader, SessionIdentityAdapter};
use super::types::RoleSelector;

/// Permission checks for callers holding a session rather than an identity.
pub struct SessionSecurity<R, A> {
    evaluator: Arc<PermissionEvaluator<R>>,
    adapter: A,
}

impl<R, A> SessionSecurity<R, A>
where
    R: PermissionReader + 'static,
    A: SessionIdentityAdapter,
{
    /// Creates a session wrapper around a shared evaluator.
    pub fn new(evaluator: Arc<PermissionEvaluator<R>>, adapter: A) -> Self {
        Self { evaluator, adapter }
    }

    /// Returns the underlying evaluator.
    pub fn evaluator(&self) -> &Arc<PermissionEvaluator<R>> {
        &self.evaluator
    }

    /// Resolves the logged-in user of `session`.
    pub fn identity_of(&self, session: &A::Session) -> DomainResult<UserIdentity> {
        self.adapter
            .identity_of(session)
            .ok_or(DomainError::NotAuthenticated)
    }

    /// Direct permission check for the session's user. Fails with
    /// `NotAuthenticated` for an anonymous session.
    pub async fn try_has_permission(
        &self,
        permission: &Permission,
        session: &A::Session,
    ) -> DomainResult<bool> {
        let user = self.identity_of(session)?;
        self.evaluator.try_has_permission(permission, &user).await
    }

    /// Fail-closed form of [`try_has_permission`](Self::try_has_permission).
    pub async fn has_permission(&self, permission: &Permission, session: &A::Session) -> bool {
        match self.authenticated(session) {
            Some(user) => self.evaluator.has_permission(permission, &user).await,
            None => false,
        }
    }

    /// Entity permission check, honoring the admin alias, for the session's user.
    pub async fn try_has_entity_permission(
        &self,
        entity: &str,
        action: &str,
        session: &A::Session,
    ) -> DomainResult<bool> {
        let user = self.identity_of(session)?;
        self.evaluator
            .try_has_entity_permission(entity, action, &user)
            .await
    }

    /// Fail-closed form of
    /// [`try_has_entity_permission`](Self::try_has_entity_permission).
    pub async fn has_entity_permission(
        &self,
        entity: &str,
        action: &str,
        session: &A::Session,
    ) -> bool {
        match self.authenticated(session) {
            Some(user) => {
                self.evaluator
                    .has_entity_permission(entity, action, &user)
                    .await
            }
            None => false,
        }
    }

    /// Role-scoped check on record `primary_key` for the session's user.
    pub async fn try_has_role_permission(
        &self,
        application: &str,
        action: &str,
        primary_key: &str,
        roles: &RoleSelector,
        session: &A::Session,
    ) -> DomainResult<bool> {
        let user = self.identity_of(session)?;
        self.evaluator
            .try_has_role_permission(application, action, primary_key, roles, &user)
            .await
    }

    /// Fail-closed form of
    /// [`try_has_role_permission`](Self::try_has_role_permission).
    pub async fn has_role_permission(
        &self,
        application: &str,
        action: &str,
        primary_key: &str,
        roles: &RoleSelector,
        session: &A::Session,
    ) -> bool {
        match self.authenticated(session) {
            Some(user) => {
                self.evaluator
                    .has_role_permission(application, action, primary_key, roles, &user)
                    .await
            }
            None => false,
        }
    }

    /// Clears cached data for the session's user, if it has one.
    pub fn clear_user_data(&self, session: &A::Session) {
        if let Some(user) = self.adapter.identity_of(session) {
            self.evaluator.clear_user_data(&user);
        }
    }

    fn authenticated(&self, session: &A::Session) -> Option<UserIdentity> {
        let user = self.adapter.identity_of(session);
        if user.is_none() {
            debug!("no authenticated identity in session, denying");
        }
        user
    }
}
