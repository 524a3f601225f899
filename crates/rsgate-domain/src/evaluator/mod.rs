//! Permission evaluation.
//!
//! The evaluator answers three kinds of question for a user:
//!
//! - direct: does any of the user's groups grant permission P?
//! - entity: does the user hold `ENTITY_ACTION` or the `ENTITY_ADMIN` alias?
//! - role-scoped: entity permission, plus a role binding on the record.
//!
//! Each question has one identity-based primitive on [`PermissionEvaluator`];
//! [`SessionSecurity`] wraps those primitives for callers holding a session
//! instead of an identity.
//!
//! # Failure Policy
//!
//! Checks fail closed. When security data cannot be read the boolean forms
//! return `false`, log the failure at `warn` and count it in
//! `rsgate_lookup_failures_total`. The `try_*` forms return the failure to
//! callers that need to tell "denied" apart from "could not decide".

mod config;
mod permission_evaluator;
mod session;
mod traits;
mod types;

pub use config::EvaluatorConfig;
pub use permission_evaluator::PermissionEvaluator;
pub use session::SessionSecurity;
pub use traits::{PermissionReader, SessionIdentityAdapter};
pub use types::RoleSelector;

#[cfg(test)]
mod tests;
