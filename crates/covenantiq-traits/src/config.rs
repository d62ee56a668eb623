//! Engine configuration.
//!
//! Configuration contains:
//! - Evaluation bands
//! - Prediction parameters
//! - Alert horizon and severity cut-offs
//! - Trend period length
//! - Refresh schedule
//!
//! Configuration does NOT contain:
//! - Loan, covenant or measurement data
//! - Server binding (that's the server crate)

use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// SECTIONS
// =============================================================================

/// Threshold evaluation bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Warning band as a percentage of threshold magnitude.
    pub warning_band_pct: f64,
    /// Pass band for `=` covenants as a percentage of threshold magnitude.
    pub equality_tolerance_pct: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            warning_band_pct: 10.0,
            equality_tolerance_pct: 5.0,
        }
    }
}

/// Breach prediction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Minimum measurements before predicting.
    pub min_samples: usize,
    /// Noise floor: projected change as a percentage of threshold.
    pub noise_floor_pct: f64,
    /// Window the noise floor projection covers.
    pub noise_window_days: u32,
    /// Crossings further out are not reported.
    pub max_horizon_days: i64,
    /// Samples needed for undiscounted confidence.
    pub full_confidence_samples: usize,
    /// R² below which a fit is noisy.
    pub noisy_fit_r_squared: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            noise_floor_pct: 2.0,
            noise_window_days: 90,
            max_horizon_days: 730,
            full_confidence_samples: 6,
            noisy_fit_r_squared: 0.5,
        }
    }
}

/// Alert generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Predictions within this many days open an alert.
    pub horizon_days: i64,
    /// At or under this many days the alert is high severity.
    pub high_days: i64,
    /// At or under this many days the alert is medium severity.
    pub medium_days: i64,
    /// Predicted date shifts beyond this count as material.
    pub material_shift_days: i64,
    /// Retries after a compare-and-swap conflict.
    pub conflict_retries: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            horizon_days: 90,
            high_days: 14,
            medium_days: 45,
            material_shift_days: 5,
            conflict_retries: 1,
        }
    }
}

/// Trend series parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Months per period.
    pub months: u32,
    /// Gaps longer than this are reported.
    pub max_gap_days: i64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            months: 6,
            max_gap_days: 400,
        }
    }
}

// =============================================================================
// ENGINE CONFIG
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluation bands.
    pub evaluation: EvaluationConfig,
    /// Prediction parameters.
    pub prediction: PredictionConfig,
    /// Alert parameters.
    pub alerts: AlertConfig,
    /// Trend parameters.
    pub trends: TrendConfig,
    /// Seconds between scheduled refreshes; 0 disables the scheduler.
    pub refresh_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evaluation: EvaluationConfig::default(),
            prediction: PredictionConfig::default(),
            alerts: AlertConfig::default(),
            trends: TrendConfig::default(),
            refresh_interval_secs: 300,
        }
    }
}

impl EngineConfig {
    /// Scheduler period, or `None` when disabled.
    #[must_use]
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), String> {
        if self.alerts.high_days > self.alerts.medium_days {
            return Err("alerts.high_days must not exceed alerts.medium_days".into());
        }
        if self.prediction.min_samples < 2 {
            return Err("prediction.min_samples must be at least 2".into());
        }
        if self.trends.months == 0 {
            return Err("trends.months must be positive".into());
        }
        if self.evaluation.warning_band_pct < 0.0 || self.evaluation.equality_tolerance_pct < 0.0 {
            return Err("evaluation bands must not be negative".into());
        }
        Ok(())
    }
}
