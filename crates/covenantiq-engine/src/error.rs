//! Engine error types.

use thiserror::Error;

use covenantiq_analytics::AnalyticsError;
use covenantiq_core::{AlertType, CoreError, CovenantId, Date};
use covenantiq_portfolio::PortfolioError;
use covenantiq_traits::TraitError;

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Entity not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Entity already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Rejected input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A measurement already exists for the covenant on that date
    #[error("measurement for covenant {covenant_id} on {date} already recorded")]
    DuplicateMeasurement {
        /// Covenant measured.
        covenant_id: CovenantId,
        /// Test date.
        date: Date,
    },

    /// Alert write lost the compare-and-swap race after retrying
    #[error("concurrent write conflict on {alert_type} alert for covenant {covenant_id}")]
    ConcurrentAlertWriteConflict {
        /// Covenant of the contested alert.
        covenant_id: CovenantId,
        /// Alert kind.
        alert_type: AlertType,
    },

    /// Storage error
    #[error("storage error: {0}")]
    Storage(TraitError),

    /// Analytics error
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Portfolio error
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    /// Domain validation error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A recompute task died
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// Shutdown
    #[error("engine is shutting down")]
    Shutdown,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Creates a not-found error for an entity kind and id.
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        EngineError::NotFound(format!("{kind} {id}"))
    }

    /// Creates an invalid input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        EngineError::InvalidInput(reason.into())
    }

    /// Whether the caller supplied bad input, as opposed to a server fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            EngineError::InvalidInput(_) | EngineError::Core(_) => true,
            EngineError::Analytics(e) => matches!(
                e,
                AnalyticsError::InvalidOperator { .. }
                    | AnalyticsError::InvalidPeriod { .. }
                    | AnalyticsError::Core(_)
            ),
            EngineError::Storage(TraitError::InvalidInput(_)) => true,
            _ => false,
        }
    }
}

impl From<TraitError> for EngineError {
    fn from(e: TraitError) -> Self {
        match e {
            TraitError::NotFound(what) => EngineError::NotFound(what),
            TraitError::InvalidInput(reason) => EngineError::InvalidInput(reason),
            TraitError::AlreadyExists(what) => EngineError::AlreadyExists(what),
            other => EngineError::Storage(other),
        }
    }
}
