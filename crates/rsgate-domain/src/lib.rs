//! rsgate-domain: Permission resolution and caching
//!
//! This crate contains the core security logic:
//! - Identifier types and the permission naming convention
//! - Group membership and group grant caches with duplicate suppression
//! - The permission evaluator (direct, entity and role-scoped checks)
//! - Session identity adaptation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                rsgate-domain                 │
//! ├─────────────────────────────────────────────┤
//! │  model/      - Identifiers & conventions    │
//! │  cache/      - Membership & grant caches    │
//! │  evaluator/  - Permission evaluation        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod evaluator;
pub mod model;

// Re-export commonly used types at the crate root
pub use cache::{CacheConfig, GrantCache, MembershipCache};
pub use error::{DomainError, DomainResult, LookupFailure, LookupResult};
pub use evaluator::{
    EvaluatorConfig, PermissionEvaluator, PermissionReader, RoleSelector, SessionIdentityAdapter,
    SessionSecurity,
};
pub use model::{GroupId, GroupSet, Permission, PermissionConvention, RoleTypeId, UserIdentity};
