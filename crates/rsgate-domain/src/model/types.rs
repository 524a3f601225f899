//! Core identifier types for the security model.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, rejecting empty values.
            pub fn new(value: impl Into<String>) -> DomainResult<Self> {
                let value = value.into();
                if value.is_empty() {
                    return Err(DomainError::InvalidIdentifier {
                        kind: $kind,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(value: String) -> DomainResult<Self> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = DomainError;

            fn try_from(value: &str) -> DomainResult<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }
    };
}

identifier!(
    /// The authenticated login id of a user (e.g., "admin").
    ///
    /// Fixed for the lifetime of a session.
    UserIdentity,
    "user identity"
);

identifier!(
    /// A security group id (e.g., "FULLADMIN").
    GroupId,
    "group id"
);

identifier!(
    /// A permission name (e.g., "ORDERMGR_VIEW").
    ///
    /// Compared by exact match only.
    Permission,
    "permission"
);

identifier!(
    /// A role type id used by record-level checks (e.g., "MANAGER").
    RoleTypeId,
    "role type id"
);

/// The groups a user belongs to.
pub type GroupSet = HashSet<GroupId>;
