//! Concurrency tests for the security service.
//!
//! Many tasks checking, logging out and administering at once against one
//! shared service. Reads are slowed down so that callers genuinely overlap.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use common::{
    create_service, group, permission, seed_order_fixture, session_for, user,
    CONCURRENT_CALLERS,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_checks_read_storage_once() {
    // Arrange
    let (store, service) = create_service();
    seed_order_fixture(&service).await;
    store.set_read_delay(Duration::from_millis(50));
    let service = Arc::new(service);

    // Act
    let handles: Vec<_> = (0..CONCURRENT_CALLERS)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .has_permission(&permission("ORDERMGR_VIEW"), &session_for("bob"))
                    .await
            })
        })
        .collect();
    let results = join_all(handles).await;

    // Assert
    for result in results {
        assert!(result.unwrap());
    }
    assert_eq!(store.membership_reads(), 1);
    assert_eq!(store.grant_reads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_group_members_share_one_grant_read() {
    let (store, service) = create_service();
    seed_order_fixture(&service).await;
    for i in 0..CONCURRENT_CALLERS {
        service
            .add_membership(&user(&format!("member{i}")), &group("ORDERVIEW"))
            .await
            .unwrap();
    }
    store.set_read_delay(Duration::from_millis(30));
    let service = Arc::new(service);

    let handles: Vec<_> = (0..CONCURRENT_CALLERS)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .user_has_permission(
                        &permission("ORDERMGR_VIEW"),
                        &user(&format!("member{i}")),
                    )
                    .await
            })
        })
        .collect();

    for result in join_all(handles).await {
        assert!(result.unwrap());
    }
    assert_eq!(store.membership_reads(), CONCURRENT_CALLERS);
    assert_eq!(store.grant_reads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_membership_removed_during_slow_read_is_not_resurrected() {
    // Arrange: bob's membership read is in flight with the old data
    let (store, service) = create_service();
    seed_order_fixture(&service).await;
    store.set_read_delay(Duration::from_millis(200));
    let service = Arc::new(service);

    let in_flight = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.security_groups(&user("bob")).await })
    };
    while store.membership_reads() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Act: the membership is removed while that read is still sleeping
    service
        .remove_membership(&user("bob"), &group("ORDERVIEW"))
        .await
        .unwrap();
    store.set_read_delay(Duration::ZERO);

    let stale = in_flight.await.unwrap().unwrap();
    assert!(stale.contains(&group("ORDERVIEW")));

    // Assert: the stale answer was not cached
    let groups = service.security_groups(&user("bob")).await.unwrap();
    assert!(groups.is_empty());
    assert!(
        !service
            .user_has_permission(&permission("ORDERMGR_VIEW"), &user("bob"))
            .await
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_checks_during_logouts_never_error() {
    let (_store, service) = create_service();
    seed_order_fixture(&service).await;
    let service = Arc::new(service);

    let checkers: Vec<_> = (0..CONCURRENT_CALLERS)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                for _ in 0..20 {
                    assert!(
                        service
                            .has_permission(&permission("ORDERMGR_VIEW"), &session_for("bob"))
                            .await
                    );
                }
            })
        })
        .collect();
    let logouts: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                for _ in 0..20 {
                    let mut session = session_for("bob");
                    service.logout(&mut session);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for result in join_all(checkers.into_iter().chain(logouts)).await {
        result.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_final_grant_state_wins_after_concurrent_toggling() {
    let (_store, service) = create_service();
    seed_order_fixture(&service).await;
    let service = Arc::new(service);
    let target = permission("ORDERMGR_EXPORT");

    let togglers: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            let target = target.clone();
            tokio::spawn(async move {
                for _ in 0..25 {
                    if i % 2 == 0 {
                        service.add_grant(&group("ORDERVIEW"), &target).await.unwrap();
                    } else {
                        service
                            .remove_grant(&group("ORDERVIEW"), &target)
                            .await
                            .unwrap();
                    }
                    service.user_has_permission(&target, &user("bob")).await;
                }
            })
        })
        .collect();
    for result in join_all(togglers).await {
        result.unwrap();
    }

    // Once writers are done the cache must agree with the store.
    service
        .remove_grant(&group("ORDERVIEW"), &target)
        .await
        .unwrap();
    assert!(!service.user_has_permission(&target, &user("bob")).await);

    service
        .add_grant(&group("ORDERVIEW"), &target)
        .await
        .unwrap();
    assert!(service.user_has_permission(&target, &user("bob")).await);
}
