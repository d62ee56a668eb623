//! # CovenantIQ Analytics
//!
//! Pure calculation components of the covenant compliance engine:
//!
//! - **Evaluation**: classify a measurement against its threshold
//!   ([`ThresholdEvaluator`])
//! - **Trends**: bucket measurement history into aligned monthly series
//!   ([`TrendAggregator`])
//! - **Prediction**: fit a linear trajectory and forecast the breach date
//!   ([`BreachPredictor`])
//!
//! Every function here is deterministic and free of I/O, so callers may run
//! them in parallel across covenants.
//!
//! ## Usage
//!
//! ```rust
//! use covenantiq_analytics::prelude::*;
//! use covenantiq_core::prelude::*;
//!
//! let status = evaluate(Some(ThresholdOperator::LessOrEqual), Some(3.0), 3.2);
//! assert_eq!(status, ComplianceStatus::Breach);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;

pub use error::{AnalyticsError, AnalyticsResult};

// ============================================================================
// MODULES
// ============================================================================

pub mod evaluation;
pub mod prediction;
pub mod trends;

pub use evaluation::{evaluate, Evaluation, EvaluationSettings, ThresholdEvaluator};
pub use prediction::{
    BreachPredictor, NoPredictionReason, PredictionOutcome, PredictionResult, PredictionSettings,
};
pub use trends::{
    percentage_change, status_change_pct, AggregationRule, DataGap, Observation, Period,
    TrendAggregation, TrendAggregator, TrendSeries,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{AnalyticsError, AnalyticsResult};
    pub use crate::evaluation::{evaluate, Evaluation, EvaluationSettings, ThresholdEvaluator};
    pub use crate::prediction::{
        BreachPredictor, NoPredictionReason, PredictionOutcome, PredictionResult,
        PredictionSettings,
    };
    pub use crate::trends::{
        percentage_change, status_change_pct, AggregationRule, Observation, Period,
        TrendAggregator, TrendSeries,
    };
}
