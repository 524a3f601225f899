//! Adapters that bridge the storage layer to the domain layer.
//!
//! The domain layer (rsgate-domain) reads security data through the
//! `PermissionReader` trait. The storage layer (rsgate-storage) implements
//! `SecurityStore` over concrete backends. [`StoreReader`] connects the two:
//! it turns stored strings into domain identifiers and every storage error
//! into a `LookupFailure`, which the evaluator treats as "deny".

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use rsgate_domain::error::{LookupFailure, LookupResult};
use rsgate_domain::evaluator::PermissionReader;
use rsgate_domain::model::{GroupId, GroupSet, Permission, RoleTypeId, UserIdentity};
use rsgate_storage::{RoleBindingKey, SecurityStore, StorageError};

/// Adapter that implements `PermissionReader` using a `SecurityStore`.
pub struct StoreReader<S: SecurityStore> {
    storage: Arc<S>,
}

impl<S: SecurityStore> StoreReader<S> {
    /// Creates a new adapter wrapping the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

fn lookup_failure(error: StorageError) -> LookupFailure {
    LookupFailure::Storage {
        message: format!("storage error: {error}"),
    }
}

/// Converts stored ids, skipping (and logging) any the domain rejects.
fn convert_ids<T, E>(
    ids: HashSet<String>,
    kind: &'static str,
    convert: impl Fn(String) -> Result<T, E>,
) -> HashSet<T>
where
    T: std::hash::Hash + Eq,
    E: std::fmt::Display,
{
    ids.into_iter()
        .filter_map(|id| match convert(id) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(kind, error = %e, "ignoring unusable stored id");
                None
            }
        })
        .collect()
}

#[async_trait]
impl<S: SecurityStore> PermissionReader for StoreReader<S> {
    async fn find_memberships(&self, user: &UserIdentity) -> LookupResult<GroupSet> {
        let ids = self
            .storage
            .find_memberships(user.as_str())
            .await
            .map_err(lookup_failure)?;

        Ok(convert_ids(ids, "group id", GroupId::new))
    }

    async fn find_grant(&self, group: &GroupId, permission: &Permission) -> LookupResult<bool> {
        self.storage
            .find_grant(group.as_str(), permission.as_str())
            .await
            .map_err(lookup_failure)
    }

    async fn find_role_bindings(
        &self,
        application: &str,
        primary_key: &str,
        user: &UserIdentity,
    ) -> LookupResult<HashSet<RoleTypeId>> {
        let key = RoleBindingKey::new(application, primary_key, user.as_str());
        let ids = self
            .storage
            .find_role_bindings(&key)
            .await
            .map_err(lookup_failure)?;

        Ok(convert_ids(ids, "role type id", RoleTypeId::new))
    }
}
