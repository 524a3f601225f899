//! rsgate-storage: Storage abstraction layer
//!
//! This crate provides the persistence side of the security engine:
//! - SecurityStore trait for membership, grant and role-binding data
//! - In-memory implementation for tests and single-node deployments
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsgate-storage                 │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - SecurityStore definition     │
//! │  memory.rs   - In-memory implementation     │
//! │  error.rs    - StorageError                 │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use traits::{RoleBindingKey, SecurityStore};
