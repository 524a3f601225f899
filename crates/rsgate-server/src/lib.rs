//! rsgate-server: Security service wiring
//!
//! This crate assembles the storage and domain layers into a service an
//! application can create once at startup:
//! - Configuration management (YAML + environment)
//! - Structured logging setup
//! - Storage → domain adapter
//! - Attribute-map sessions
//! - The `SecurityService` facade (checks, logout, administration)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsgate-server                  │
//! ├─────────────────────────────────────────────┤
//! │  config.rs        - Configuration           │
//! │  observability/   - Logging setup           │
//! │  adapters.rs      - SecurityStore bridge    │
//! │  session.rs       - Session attributes      │
//! │  service.rs       - SecurityService facade  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod config;
pub mod observability;
pub mod service;
pub mod session;

// Re-exports for convenience
pub use config::{ConfigLoadError, SecurityConfig};
pub use service::{MemorySecurityService, SecurityService, ServiceError, ServiceResult};
pub use session::{AttributeIdentityAdapter, SessionAttributes};
