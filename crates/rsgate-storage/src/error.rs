//! Storage error types.

use thiserror::Error;

/// Errors returned by a [`SecurityStore`](crate::SecurityStore).
#[derive(Debug, Error)]
pub enum StorageError {
    /// An identifier the backend cannot hold.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The backend could not be reached.
    #[error("security store unavailable: {message}")]
    Unavailable { message: String },

    /// The backend was reached but the read or write failed.
    #[error("security store backend error: {message}")]
    Backend { message: String },
}

pub type StorageResult<T> = Result<T, StorageError>;
