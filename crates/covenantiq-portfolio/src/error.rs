//! Error types for portfolio analytics.

use covenantiq_analytics::AnalyticsError;
use thiserror::Error;

/// Result type for portfolio operations.
pub type PortfolioResult<T> = Result<T, PortfolioError>;

/// Errors that can occur during portfolio operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
    /// Loan not present in the snapshot.
    #[error("Loan not found: {id}")]
    LoanNotFound {
        /// The loan ID.
        id: String,
    },

    /// Covenant not present in the snapshot.
    #[error("Covenant not found: {id}")]
    CovenantNotFound {
        /// The covenant ID.
        id: String,
    },

    /// Calculation failed.
    #[error("Calculation failed: {reason}")]
    CalculationFailed {
        /// The reason the calculation failed.
        reason: String,
    },

    /// Underlying analytics error.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

impl PortfolioError {
    /// Creates a loan not found error.
    pub fn loan_not_found(id: impl Into<String>) -> Self {
        Self::LoanNotFound { id: id.into() }
    }

    /// Creates a covenant not found error.
    pub fn covenant_not_found(id: impl Into<String>) -> Self {
        Self::CovenantNotFound { id: id.into() }
    }

    /// Creates a calculation failed error.
    pub fn calculation_failed(reason: impl Into<String>) -> Self {
        Self::CalculationFailed {
            reason: reason.into(),
        }
    }
}
