//! Property-based tests for model types.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::{Permission, PermissionConvention, UserIdentity};

    proptest! {
        #[test]
        fn test_non_empty_identifiers_are_accepted(value in "[A-Za-z0-9_]{1,40}") {
            let user = UserIdentity::new(value.clone());
            prop_assert!(user.is_ok(), "Failed for identity: {}", value);
            let user = user.unwrap();
            prop_assert_eq!(user.as_str(), value.as_str());
        }

        #[test]
        fn test_entity_permission_starts_with_entity(
            entity in "[A-Z]{1,12}",
            action in "[A-Z]{1,12}"
        ) {
            let convention = PermissionConvention::default();
            let permission = convention.entity_permission(&entity, &action).unwrap();
            prop_assert_eq!(permission.as_str(), format!("{entity}_{action}"));
        }

        #[test]
        fn test_prefixed_and_bare_actions_agree(
            entity in "[A-Z]{1,12}",
            action in "[A-Z]{1,12}"
        ) {
            let convention = PermissionConvention::default();
            let bare = convention.entity_permission(&entity, &action).unwrap();
            let prefixed = convention
                .entity_permission(&entity, &format!("_{action}"))
                .unwrap();
            prop_assert_eq!(bare, prefixed);
        }

        #[test]
        fn test_admin_alias_never_equals_other_actions(
            entity in "[A-Z]{1,12}",
            action in "[A-Z]{1,12}"
        ) {
            prop_assume!(action != "ADMIN");
            let convention = PermissionConvention::default();
            let direct: Permission = convention.entity_permission(&entity, &action).unwrap();
            let admin = convention.admin_permission(&entity).unwrap().unwrap();
            prop_assert_ne!(direct, admin);
        }
    }
}
