//! Error types for numeric routines.

use thiserror::Error;

/// A specialized Result type for numeric routines.
pub type MathResult<T> = Result<T, MathError>;

/// Errors that can occur during numeric routines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    /// Insufficient data points for operation.
    #[error("Insufficient data: need at least {required}, got {actual}")]
    InsufficientData {
        /// Minimum required points.
        required: usize,
        /// Actual number of points.
        actual: usize,
    },

    /// Input slices differ in length.
    #[error("Length mismatch: {xs} x values, {ys} y values")]
    LengthMismatch {
        /// Number of x values.
        xs: usize,
        /// Number of y values.
        ys: usize,
    },

    /// All x values are identical, so no slope exists.
    #[error("Degenerate input: x values have zero variance")]
    ZeroVariance,

    /// A non-finite value was supplied.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },

    /// Division by zero or near-zero value.
    #[error("Division by zero or near-zero value: {value:.2e}")]
    DivisionByZero {
        /// The near-zero value.
        value: f64,
    },
}

impl MathError {
    /// Creates an insufficient data error.
    #[must_use]
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}
