//! Domain error types for permission evaluation.

use thiserror::Error;

/// Infrastructure failure while fetching security data.
///
/// Never cached. Cloneable so one failed fetch can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupFailure {
    /// The persistence collaborator reported an error.
    #[error("security data lookup failed: {message}")]
    Storage { message: String },

    /// The persistence collaborator did not answer in time.
    #[error("security data lookup timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Result type for persistence lookups.
pub type LookupResult<T> = Result<T, LookupFailure>;

/// Domain-specific errors for permission evaluation.
///
/// There is deliberately no "permission denied" variant: denial is `false`.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Security data could not be read; checks fail closed.
    #[error(transparent)]
    LookupFailure(#[from] LookupFailure),

    /// No identity could be resolved from the session context.
    #[error("no authenticated identity in session")]
    NotAuthenticated,

    /// An identifier was empty or otherwise unusable.
    #[error("invalid {kind}: {value:?}")]
    InvalidIdentifier { kind: &'static str, value: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
