//! Traits for the collaborators the evaluator depends on.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::LookupResult;
use crate::model::{GroupId, GroupSet, Permission, RoleTypeId, UserIdentity};

/// Read access to security data needed by the evaluator.
///
/// Implementations report every infrastructure problem as a
/// [`LookupFailure`](crate::error::LookupFailure); "not found" is an empty
/// set or `false`, never an error.
#[async_trait]
pub trait PermissionReader: Send + Sync {
    /// Returns the groups `user` belongs to.
    async fn find_memberships(&self, user: &UserIdentity) -> LookupResult<GroupSet>;

    /// Returns whether `group` has been granted `permission`.
    async fn find_grant(&self, group: &GroupId, permission: &Permission) -> LookupResult<bool>;

    /// Returns the role types `user` holds on one record of `application`.
    async fn find_role_bindings(
        &self,
        application: &str,
        primary_key: &str,
        user: &UserIdentity,
    ) -> LookupResult<HashSet<RoleTypeId>>;
}

/// Extracts the authenticated identity from a session-like context.
pub trait SessionIdentityAdapter: Send + Sync {
    /// The session type this adapter reads.
    type Session: ?Sized + Sync;

    /// Returns the logged-in user, or `None` for an anonymous session.
    fn identity_of(&self, session: &Self::Session) -> Option<UserIdentity>;
}
