//! Error types for trait operations.

use thiserror::Error;

/// Common error type for trait operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraitError {
    /// Requested resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Compare-and-swap precondition failed
    #[error("version conflict: {0}")]
    Conflict(String),

    /// Parse/deserialization error
    #[error("parse error: {0}")]
    ParseError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Source not available
    #[error("source not available: {0}")]
    SourceNotAvailable(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for TraitError {
    fn from(e: std::io::Error) -> Self {
        TraitError::IoError(e.to_string())
    }
}

impl From<covenantiq_core::CoreError> for TraitError {
    fn from(e: covenantiq_core::CoreError) -> Self {
        TraitError::InvalidInput(e.to_string())
    }
}
