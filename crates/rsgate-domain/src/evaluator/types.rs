//! Request types for role-scoped checks.

use crate::model::RoleTypeId;

/// The role types acceptable for a role-scoped check.
///
/// Holding any one of them is sufficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSelector {
    /// Exactly one acceptable role.
    One(RoleTypeId),
    /// Any of several roles.
    AnyOf(Vec<RoleTypeId>),
}

impl RoleSelector {
    /// No acceptable roles at all.
    pub fn none() -> Self {
        RoleSelector::AnyOf(Vec::new())
    }

    /// Returns the acceptable roles as a slice.
    pub fn roles(&self) -> &[RoleTypeId] {
        match self {
            RoleSelector::One(role) => std::slice::from_ref(role),
            RoleSelector::AnyOf(roles) => roles,
        }
    }

    /// Returns true when no role is acceptable.
    pub fn is_empty(&self) -> bool {
        self.roles().is_empty()
    }
}

impl From<RoleTypeId> for RoleSelector {
    fn from(role: RoleTypeId) -> Self {
        RoleSelector::One(role)
    }
}

impl From<Vec<RoleTypeId>> for RoleSelector {
    fn from(roles: Vec<RoleTypeId>) -> Self {
        RoleSelector::AnyOf(roles)
    }
}
