//! Permission naming convention.
//!
//! Entity permissions are named `<ENTITY><sep><ACTION>` and the blanket
//! grant for an entity is `<ENTITY><sep><ADMIN_SUFFIX>`. Both pieces are
//! configurable; the defaults produce `ORDERMGR_VIEW` and `ORDERMGR_ADMIN`.

use serde::{Deserialize, Serialize};

use crate::error::DomainResult;

use super::types::Permission;

/// How entity/action pairs and the admin alias map onto permission names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionConvention {
    /// Separator between entity and action.
    pub separator: String,
    /// Action name that grants every action on an entity.
    pub admin_suffix: String,
    /// Whether the admin alias is consulted at all.
    pub admin_alias_enabled: bool,
}

impl Default for PermissionConvention {
    fn default() -> Self {
        Self {
            separator: "_".to_string(),
            admin_suffix: "ADMIN".to_string(),
            admin_alias_enabled: true,
        }
    }
}

impl PermissionConvention {
    /// Sets the entity/action separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the admin action name.
    pub fn with_admin_suffix(mut self, admin_suffix: impl Into<String>) -> Self {
        self.admin_suffix = admin_suffix.into();
        self
    }

    /// Enables or disables the admin alias fallback.
    pub fn with_admin_alias(mut self, enabled: bool) -> Self {
        self.admin_alias_enabled = enabled;
        self
    }

    /// Composes the permission for `action` on `entity`.
    ///
    /// An action that already starts with the separator is appended as is,
    /// so `("ORDERMGR", "_VIEW")` and `("ORDERMGR", "VIEW")` agree.
    pub fn entity_permission(&self, entity: &str, action: &str) -> DomainResult<Permission> {
        Permission::new(self.join(entity, action))
    }

    /// Composes the admin alias for `entity`, or `None` when disabled.
    pub fn admin_permission(&self, entity: &str) -> DomainResult<Option<Permission>> {
        if !self.admin_alias_enabled {
            return Ok(None);
        }
        Permission::new(self.join(entity, &self.admin_suffix)).map(Some)
    }

    fn join(&self, entity: &str, action: &str) -> String {
        if action.is_empty() || (!self.separator.is_empty() && action.starts_with(&self.separator))
        {
            format!("{entity}{action}")
        } else {
            format!("{entity}{}{action}", self.separator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_convention_composes_entity_permission() {
        let convention = PermissionConvention::default();

        let permission = convention.entity_permission("ORDER", "view").unwrap();

        assert_eq!(permission.as_str(), "ORDER_view");
    }

    #[test]
    fn test_action_with_leading_separator_is_not_doubled() {
        let convention = PermissionConvention::default();

        let permission = convention.entity_permission("ORDERMGR", "_VIEW").unwrap();

        assert_eq!(permission.as_str(), "ORDERMGR_VIEW");
    }

    #[test]
    fn test_admin_alias_uses_suffix() {
        let convention = PermissionConvention::default();

        let admin = convention.admin_permission("ORDER").unwrap();

        assert_eq!(admin.unwrap().as_str(), "ORDER_ADMIN");
    }

    #[test]
    fn test_admin_alias_can_be_disabled() {
        let convention = PermissionConvention::default().with_admin_alias(false);

        assert!(convention.admin_permission("ORDER").unwrap().is_none());
    }

    #[test]
    fn test_custom_separator_and_suffix() {
        let convention = PermissionConvention::default()
            .with_separator(":")
            .with_admin_suffix("all");

        assert_eq!(
            convention.entity_permission("order", "read").unwrap().as_str(),
            "order:read"
        );
        assert_eq!(
            convention.admin_permission("order").unwrap().unwrap().as_str(),
            "order:all"
        );
    }

    #[test]
    fn test_empty_entity_and_action_is_invalid() {
        let convention = PermissionConvention::default();

        assert!(convention.entity_permission("", "").is_err());
    }
}
