//! SecurityStore trait definition.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

/// Maximum length of any identifier accepted by the store.
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// Address of a role binding: which record of which application, for whom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleBindingKey {
    pub application: String,
    pub primary_key: String,
    pub user_login_id: String,
}

impl RoleBindingKey {
    pub fn new(
        application: impl Into<String>,
        primary_key: impl Into<String>,
        user_login_id: impl Into<String>,
    ) -> Self {
        Self {
            application: application.into(),
            primary_key: primary_key.into(),
            user_login_id: user_login_id.into(),
        }
    }
}

/// Abstract storage interface for security data.
///
/// Reads back the permission engine; the mutating methods are the
/// administrative surface. Implementations must be thread-safe
/// (Send + Sync) and support async operations.
#[async_trait]
pub trait SecurityStore: Send + Sync + 'static {
    // Read operations

    /// Returns the group ids the user belongs to. Unknown users have no groups.
    async fn find_memberships(&self, user_login_id: &str) -> StorageResult<HashSet<String>>;

    /// Returns whether the group has been granted the permission.
    async fn find_grant(&self, group_id: &str, permission: &str) -> StorageResult<bool>;

    /// Returns the role type ids bound to the user for one record.
    async fn find_role_bindings(&self, key: &RoleBindingKey) -> StorageResult<HashSet<String>>;

    // Administrative operations

    /// Adds the user to a group. Adding an existing membership is a no-op.
    async fn add_membership(&self, user_login_id: &str, group_id: &str) -> StorageResult<()>;

    /// Removes the user from a group. Returns whether a membership was removed.
    async fn remove_membership(&self, user_login_id: &str, group_id: &str)
        -> StorageResult<bool>;

    /// Grants a permission to a group. Granting twice is a no-op.
    async fn add_grant(&self, group_id: &str, permission: &str) -> StorageResult<()>;

    /// Revokes a permission from a group. Returns whether a grant was removed.
    async fn remove_grant(&self, group_id: &str, permission: &str) -> StorageResult<bool>;

    /// Binds a role type to the user for one record.
    async fn add_role_binding(&self, key: &RoleBindingKey, role_type_id: &str)
        -> StorageResult<()>;

    /// Removes a role binding. Returns whether a binding was removed.
    async fn remove_role_binding(
        &self,
        key: &RoleBindingKey,
        role_type_id: &str,
    ) -> StorageResult<bool>;
}

/// Validates an identifier before it reaches a backend.
///
/// Identifiers must be non-empty, at most [`MAX_IDENTIFIER_LENGTH`] bytes,
/// and free of control characters.
pub fn validate_identifier(kind: &str, value: &str) -> StorageResult<()> {
    if value.is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} cannot be empty"),
        });
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!(
                "{kind} exceeds maximum length of {MAX_IDENTIFIER_LENGTH} bytes"
            ),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(StorageError::InvalidInput {
            message: format!("{kind} contains control characters"),
        });
    }
    Ok(())
}

/// Validates a role binding key. The primary key may be empty (no record).
pub fn validate_role_binding_key(key: &RoleBindingKey) -> StorageResult<()> {
    validate_identifier("application", &key.application)?;
    validate_identifier("user_login_id", &key.user_login_id)?;
    if key.primary_key.len() > MAX_IDENTIFIER_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!(
                "primary_key exceeds maximum length of {MAX_IDENTIFIER_LENGTH} bytes"
            ),
        });
    }
    Ok(())
}
