//! Tests for the permission evaluator.
//!
//! Organized by functionality:
//! - Direct permission checks
//! - Entity permissions and the admin alias
//! - Role-scoped permissions
//! - Caching, invalidation and duplicate suppression
//! - Failure handling (fail-closed)
//! - Session-based checks


#[cfg(test)]
mod session_tests;
