use std::collections::HashMap;
use std::sync::Arc;

use super::mocks::{create_evaluator, permission, role, user};
use crate::error::DomainError;
use crate::evaluator::{RoleSelector, SessionIdentityAdapter, SessionSecurity};
use crate::model::UserIdentity;

/// Session stand-in: a plain attribute map.
type Session = HashMap<String, String>;

struct MapAdapter;

impl SessionIdentityAdapter for MapAdapter {
    type Session = Session;

    fn identity_of(&self, session: &Session) -> Option<UserIdentity> {
        session
            .get("user")
            .and_then(|id| UserIdentity::new(id.as_str()).ok())
    }
}

fn logged_in(id: &str) -> Session {
    HashMap::from([("user".to_string(), id.to_string())])
}

async fn setup() -> (
    Arc<super::mocks::MockPermissionReader>,
    SessionSecurity<super::mocks::MockPermissionReader, MapAdapter>,
) {
    let (reader, evaluator) = create_evaluator();
    reader.add_membership("alice", "G").await;
    reader.add_grant("G", "ORDERMGR_VIEW").await;
    reader
        .add_role_binding("ORDERMGR", "WS10000", "alice", "MANAGER")
        .await;
    (reader, SessionSecurity::new(evaluator, MapAdapter))
}

#[tokio::test]
async fn test_session_checks_use_logged_in_identity() {
    let (_reader, security) = setup().await;
    let session = logged_in("alice");

    assert!(
        security
            .has_permission(&permission("ORDERMGR_VIEW"), &session)
            .await
    );
    assert!(
        security
            .has_entity_permission("ORDERMGR", "_VIEW", &session)
            .await
    );
    assert!(
        security
            .has_role_permission(
                "ORDERMGR",
                "_VIEW",
                "WS10000",
                &RoleSelector::from(role("MANAGER")),
                &session,
            )
            .await
    );
}

#[tokio::test]
async fn test_anonymous_session_is_denied() {
    let (reader, security) = setup().await;
    let anonymous = Session::new();

    assert!(
        !security
            .has_permission(&permission("ORDERMGR_VIEW"), &anonymous)
            .await
    );
    assert!(
        !security
            .has_entity_permission("ORDERMGR", "_VIEW", &anonymous)
            .await
    );
    assert!(
        !security
            .has_role_permission(
                "ORDERMGR",
                "_VIEW",
                "WS10000",
                &RoleSelector::from(role("MANAGER")),
                &anonymous,
            )
            .await
    );
    assert_eq!(reader.membership_fetch_count(), 0);
}

#[tokio::test]
async fn test_anonymous_session_try_forms_report_not_authenticated() {
    let (_reader, security) = setup().await;
    let anonymous = Session::new();

    let direct = security
        .try_has_permission(&permission("ORDERMGR_VIEW"), &anonymous)
        .await;
    let entity = security
        .try_has_entity_permission("ORDERMGR", "_VIEW", &anonymous)
        .await;
    let scoped = security
        .try_has_role_permission("ORDERMGR", "_VIEW", "", &RoleSelector::none(), &anonymous)
        .await;

    assert!(matches!(direct, Err(DomainError::NotAuthenticated)));
    assert!(matches!(entity, Err(DomainError::NotAuthenticated)));
    assert!(matches!(scoped, Err(DomainError::NotAuthenticated)));
}

#[tokio::test]
async fn test_session_with_blank_identity_is_anonymous() {
    let (_reader, security) = setup().await;

    let result = security.identity_of(&logged_in(""));

    assert!(matches!(result, Err(DomainError::NotAuthenticated)));
}

#[tokio::test]
async fn test_session_clear_user_data_drops_memberships() {
    let (reader, security) = setup().await;
    let session = logged_in("alice");
    security
        .evaluator()
        .groups_of(&user("alice"))
        .await
        .unwrap();

    security.clear_user_data(&session);

    assert!(security
        .evaluator()
        .membership_cache()
        .get(&user("alice"))
        .is_none());
    security
        .evaluator()
        .groups_of(&user("alice"))
        .await
        .unwrap();
    assert_eq!(reader.membership_fetch_count(), 2);
}

#[tokio::test]
async fn test_session_clear_user_data_without_identity_is_noop() {
    let (_reader, security) = setup().await;
    security
        .evaluator()
        .groups_of(&user("alice"))
        .await
        .unwrap();

    security.clear_user_data(&Session::new());

    assert!(security
        .evaluator()
        .membership_cache()
        .get(&user("alice"))
        .is_some());
}
