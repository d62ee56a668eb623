//! Error types for the core domain model.

use thiserror::Error;

/// A specialized Result type for core domain operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while constructing or validating domain values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Invalid date construction.
    #[error("Invalid date: {message}")]
    InvalidDate {
        /// Description of the date error.
        message: String,
    },

    /// A threshold operator string could not be parsed.
    #[error("Invalid threshold operator: '{operator}'")]
    InvalidOperator {
        /// The rejected operator text.
        operator: String,
    },

    /// A status, severity or other enumerated value could not be parsed.
    #[error("Invalid {kind}: '{value}'")]
    InvalidEnum {
        /// Name of the enumeration.
        kind: &'static str,
        /// The rejected text.
        value: String,
    },

    /// A covenant defines only half of its threshold.
    #[error("Covenant {covenant_id} must define both threshold_value and threshold_operator, or neither")]
    IncompleteThreshold {
        /// The offending covenant.
        covenant_id: String,
    },

    /// Generic validation failure on an entity field.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        /// Name of the field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl CoreError {
    /// Creates an invalid date error.
    #[must_use]
    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDate {
            message: message.into(),
        }
    }

    /// Creates an invalid operator error.
    #[must_use]
    pub fn invalid_operator(operator: impl Into<String>) -> Self {
        Self::InvalidOperator {
            operator: operator.into(),
        }
    }

    /// Creates an invalid enum value error.
    #[must_use]
    pub fn invalid_enum(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnum {
            kind,
            value: value.into(),
        }
    }

    /// Creates an invalid field error.
    #[must_use]
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
