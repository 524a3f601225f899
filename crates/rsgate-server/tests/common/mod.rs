//! Shared test utilities for rsgate-server integration tests.

// Each test file uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use rsgate_domain::model::{GroupId, Permission, RoleTypeId, UserIdentity};
use rsgate_server::{SecurityConfig, SecurityService, SessionAttributes};
use rsgate_storage::{MemoryStore, RoleBindingKey, SecurityStore, StorageError, StorageResult};

/// Number of concurrent callers for concurrency tests.
pub const CONCURRENT_CALLERS: usize = 64;

/// Memory store wrapper that counts reads and can fail or slow them down.
///
/// A read is counted once the underlying data has been read, before any
/// injected delay.
#[derive(Debug, Default)]
pub struct InstrumentedStore {
    inner: MemoryStore,
    pub membership_reads: AtomicUsize,
    pub grant_reads: AtomicUsize,
    pub role_reads: AtomicUsize,
    pub fail_reads: AtomicBool,
    read_delay_ms: AtomicU64,
}

impl InstrumentedStore {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_read_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.read_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn membership_reads(&self) -> usize {
        self.membership_reads.load(Ordering::SeqCst)
    }

    pub fn grant_reads(&self) -> usize {
        self.grant_reads.load(Ordering::SeqCst)
    }

    pub fn role_reads(&self) -> usize {
        self.role_reads.load(Ordering::SeqCst)
    }

    /// Applied after the inner read, so a slow read answers with the data
    /// as it was when the read started.
    async fn after_read<T>(&self, result: StorageResult<T>) -> StorageResult<T> {
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                message: "connection refused".to_string(),
            });
        }
        result
    }
}

#[async_trait]
impl SecurityStore for InstrumentedStore {
    async fn find_memberships(&self, user_login_id: &str) -> StorageResult<HashSet<String>> {
        let result = self.inner.find_memberships(user_login_id).await;
        self.membership_reads.fetch_add(1, Ordering::SeqCst);
        self.after_read(result).await
    }

    async fn find_grant(&self, group_id: &str, permission: &str) -> StorageResult<bool> {
        let result = self.inner.find_grant(group_id, permission).await;
        self.grant_reads.fetch_add(1, Ordering::SeqCst);
        self.after_read(result).await
    }

    async fn find_role_bindings(&self, key: &RoleBindingKey) -> StorageResult<HashSet<String>> {
        let result = self.inner.find_role_bindings(key).await;
        self.role_reads.fetch_add(1, Ordering::SeqCst);
        self.after_read(result).await
    }

    async fn add_membership(&self, user_login_id: &str, group_id: &str) -> StorageResult<()> {
        self.inner.add_membership(user_login_id, group_id).await
    }

    async fn remove_membership(
        &self,
        user_login_id: &str,
        group_id: &str,
    ) -> StorageResult<bool> {
        self.inner.remove_membership(user_login_id, group_id).await
    }

    async fn add_grant(&self, group_id: &str, permission: &str) -> StorageResult<()> {
        self.inner.add_grant(group_id, permission).await
    }

    async fn remove_grant(&self, group_id: &str, permission: &str) -> StorageResult<bool> {
        self.inner.remove_grant(group_id, permission).await
    }

    async fn add_role_binding(
        &self,
        key: &RoleBindingKey,
        role_type_id: &str,
    ) -> StorageResult<()> {
        self.inner.add_role_binding(key, role_type_id).await
    }

    async fn remove_role_binding(
        &self,
        key: &RoleBindingKey,
        role_type_id: &str,
    ) -> StorageResult<bool> {
        self.inner.remove_role_binding(key, role_type_id).await
    }
}

/// Creates a service over a fresh instrumented store.
pub fn create_service() -> (Arc<InstrumentedStore>, SecurityService<InstrumentedStore>) {
    create_service_with_config(&SecurityConfig::default())
}

/// Like [`create_service`] with a custom configuration.
pub fn create_service_with_config(
    config: &SecurityConfig,
) -> (Arc<InstrumentedStore>, SecurityService<InstrumentedStore>) {
    let store = InstrumentedStore::new_shared();
    let service = SecurityService::with_store(Arc::clone(&store), config).unwrap();
    (store, service)
}

/// Seeds the order-manager fixture used across tests:
///
/// - alice ∈ ORDERADMIN, which holds ORDERMGR_ADMIN
/// - bob ∈ ORDERVIEW, which holds ORDERMGR_VIEW
/// - carol has no groups
/// - bob is MANAGER on order WS10000
pub async fn seed_order_fixture(service: &SecurityService<InstrumentedStore>) {
    service
        .add_membership(&user("alice"), &group("ORDERADMIN"))
        .await
        .unwrap();
    service
        .add_membership(&user("bob"), &group("ORDERVIEW"))
        .await
        .unwrap();
    service
        .add_grant(&group("ORDERADMIN"), &permission("ORDERMGR_ADMIN"))
        .await
        .unwrap();
    service
        .add_grant(&group("ORDERVIEW"), &permission("ORDERMGR_VIEW"))
        .await
        .unwrap();
    service
        .add_role_binding("ORDERMGR", "WS10000", &user("bob"), &role("MANAGER"))
        .await
        .unwrap();
}

/// A session logged in as `id` under the default identity attribute.
pub fn session_for(id: &str) -> SessionAttributes {
    SessionAttributes::new().with("userLoginId", id)
}

pub fn user(id: &str) -> UserIdentity {
    UserIdentity::new(id).unwrap()
}

pub fn group(id: &str) -> GroupId {
    GroupId::new(id).unwrap()
}

pub fn permission(name: &str) -> Permission {
    Permission::new(name).unwrap()
}

pub fn role(id: &str) -> RoleTypeId {
    RoleTypeId::new(id).unwrap()
}
