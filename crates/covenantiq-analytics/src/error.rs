//! Error types for the analytics components.
//!
//! Prediction failure modes (`InsufficientData`, `NoTrendDetected`,
//! `HorizonExceeded`) are normally carried as
//! [`NoPredictionReason`](crate::prediction::NoPredictionReason) values; the
//! variants here exist so callers can log or surface them uniformly.

use covenantiq_core::{CoreError, Date, Trajectory};
use covenantiq_math::MathError;
use thiserror::Error;

/// A specialized Result type for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Unified error type for analytics operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    // ========== Definition Errors ==========
    /// Malformed covenant operator.
    #[error("invalid threshold operator: '{operator}'")]
    InvalidOperator {
        /// The rejected operator text.
        operator: String,
    },

    /// Period bounds are inverted or out of range.
    #[error("invalid period: {reason}")]
    InvalidPeriod {
        /// Description of the problem.
        reason: String,
    },

    // ========== Prediction Outcomes ==========
    /// Too few measurements to fit a trend.
    #[error("insufficient data: need at least {required} measurements, got {actual}")]
    InsufficientData {
        /// Minimum required samples.
        required: usize,
        /// Samples available.
        actual: usize,
    },

    /// The fitted trend does not move toward breach.
    #[error("no deteriorating trend detected (trajectory: {trajectory})")]
    NoTrendDetected {
        /// Observed trajectory.
        trajectory: Trajectory,
    },

    /// Forecast breach lies beyond the prediction horizon.
    #[error("predicted breach in {days} days exceeds the {max_days}-day horizon")]
    HorizonExceeded {
        /// Days until the forecast crossing.
        days: i64,
        /// Configured horizon.
        max_days: i64,
    },

    /// The covenant has no threshold to predict against.
    #[error("covenant has no threshold defined")]
    NoThreshold,

    // ========== Data Quality ==========
    /// Implausible gap between consecutive measurements.
    #[error("data gap of {days} days between {from} and {to}")]
    DataGap {
        /// Last measurement before the gap.
        from: Date,
        /// First measurement after the gap.
        to: Date,
        /// Gap length.
        days: i64,
    },

    // ========== Wrapped Errors ==========
    /// Numeric routine failure.
    #[error("math error: {0}")]
    Math(#[from] MathError),

    /// Domain value failure.
    #[error("core error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for AnalyticsError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidOperator { operator } => Self::InvalidOperator { operator },
            other => Self::Core(other),
        }
    }
}

impl AnalyticsError {
    /// Creates an invalid operator error.
    #[must_use]
    pub fn invalid_operator(operator: impl Into<String>) -> Self {
        Self::InvalidOperator {
            operator: operator.into(),
        }
    }

    /// Creates an invalid period error.
    #[must_use]
    pub fn invalid_period(reason: impl Into<String>) -> Self {
        Self::InvalidPeriod {
            reason: reason.into(),
        }
    }

    /// Whether this is an expected, non-fatal outcome.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::NoTrendDetected { .. }
                | Self::HorizonExceeded { .. }
                | Self::NoThreshold
                | Self::DataGap { .. }
        )
    }
}
