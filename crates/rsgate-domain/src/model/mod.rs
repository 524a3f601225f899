//! Security model types.
//!
//! This module contains:
//! - Identifier newtypes (user, group, permission, role type)
//! - The permission naming convention (entity/action composition, admin alias)

mod convention;
mod types;
#[cfg(test)]
mod types_proptest;

pub use convention::PermissionConvention;
pub use types::*;
