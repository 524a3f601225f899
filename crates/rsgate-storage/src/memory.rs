//! In-memory storage implementation.
//!
//! Each relation lives in its own `DashMap` keyed by the lookup side of the
//! query, so every read is a single shard lookup and writes never block
//! readers of unrelated keys.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::instrument;

use crate::error::StorageResult;
use crate::traits::{
    validate_identifier, validate_role_binding_key, RoleBindingKey, SecurityStore,
};

/// In-memory implementation of SecurityStore.
///
/// # Performance Characteristics
///
/// - **find_memberships**: O(G) clone of the user's group set
/// - **find_grant**: O(1) average (HashSet lookup)
/// - **find_role_bindings**: O(R) clone of the bound role set
/// - **Mutations**: O(1) average
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// user_login_id -> group ids
    memberships: DashMap<String, HashSet<String>>,
    /// group_id -> granted permissions
    grants: DashMap<String, HashSet<String>>,
    /// (application, primary_key, user_login_id) -> role type ids
    role_bindings: DashMap<RoleBindingKey, HashSet<String>>,
}

impl MemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

/// Removes `value` from the set under `key`, dropping the set once it is empty.
fn remove_from_set<K>(map: &DashMap<K, HashSet<String>>, key: &K, value: &str) -> bool
where
    K: std::hash::Hash + Eq,
{
    let removed = match map.get_mut(key) {
        Some(mut set) => set.remove(value),
        None => return false,
    };
    map.remove_if(key, |_, set| set.is_empty());
    removed
}

#[async_trait]
impl SecurityStore for MemoryStore {
    #[instrument(skip(self))]
    async fn find_memberships(&self, user_login_id: &str) -> StorageResult<HashSet<String>> {
        validate_identifier("user_login_id", user_login_id)?;
        Ok(self
            .memberships
            .get(user_login_id)
            .map(|groups| groups.value().clone())
            .unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn find_grant(&self, group_id: &str, permission: &str) -> StorageResult<bool> {
        validate_identifier("group_id", group_id)?;
        validate_identifier("permission", permission)?;
        Ok(self
            .grants
            .get(group_id)
            .is_some_and(|permissions| permissions.contains(permission)))
    }

    #[instrument(skip(self))]
    async fn find_role_bindings(&self, key: &RoleBindingKey) -> StorageResult<HashSet<String>> {
        validate_role_binding_key(key)?;
        Ok(self
            .role_bindings
            .get(key)
            .map(|roles| roles.value().clone())
            .unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn add_membership(&self, user_login_id: &str, group_id: &str) -> StorageResult<()> {
        validate_identifier("user_login_id", user_login_id)?;
        validate_identifier("group_id", group_id)?;
        self.memberships
            .entry(user_login_id.to_string())
            .or_default()
            .insert(group_id.to_string());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_membership(
        &self,
        user_login_id: &str,
        group_id: &str,
    ) -> StorageResult<bool> {
        validate_identifier("user_login_id", user_login_id)?;
        validate_identifier("group_id", group_id)?;
        Ok(remove_from_set(
            &self.memberships,
            &user_login_id.to_string(),
            group_id,
        ))
    }

    #[instrument(skip(self))]
    async fn add_grant(&self, group_id: &str, permission: &str) -> StorageResult<()> {
        validate_identifier("group_id", group_id)?;
        validate_identifier("permission", permission)?;
        self.grants
            .entry(group_id.to_string())
            .or_default()
            .insert(permission.to_string());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_grant(&self, group_id: &str, permission: &str) -> StorageResult<bool> {
        validate_identifier("group_id", group_id)?;
        validate_identifier("permission", permission)?;
        Ok(remove_from_set(
            &self.grants,
            &group_id.to_string(),
            permission,
        ))
    }

    #[instrument(skip(self))]
    async fn add_role_binding(
        &self,
        key: &RoleBindingKey,
        role_type_id: &str,
    ) -> StorageResult<()> {
        validate_role_binding_key(key)?;
        validate_identifier("role_type_id", role_type_id)?;
        self.role_bindings
            .entry(key.clone())
            .or_default()
            .insert(role_type_id.to_string());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_role_binding(
        &self,
        key: &RoleBindingKey,
        role_type_id: &str,
    ) -> StorageResult<bool> {
        validate_role_binding_key(key)?;
        validate_identifier("role_type_id", role_type_id)?;
        Ok(remove_from_set(&self.role_bindings, key, role_type_id))
    }
}
