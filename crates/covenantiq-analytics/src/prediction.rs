//! Breach prediction.
//!
//! Fits an ordinary least squares line of measured value against days since
//! the first measurement, classifies the trajectory relative to the covenant
//! threshold and, when the trend deteriorates, solves for the day the fitted
//! line crosses the threshold.
//!
//! Expected failure modes never surface as errors. [`BreachPredictor::predict`]
//! returns [`PredictionOutcome::NoPrediction`] with a [`NoPredictionReason`]:
//!
//! - fewer than `min_samples` measurements
//! - no threshold defined
//! - trajectory improving or stable
//! - crossing further out than `max_horizon_days`
//!
//! Confidence is `R² · min(1, n / full_confidence_samples)`.

use covenantiq_core::{Date, ThresholdOperator, Trajectory};
use covenantiq_math::{LinearFit, MathError};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::evaluation::ThresholdEvaluator;
use crate::trends::Observation;

/// Slopes below this magnitude are flat regardless of the noise floor.
const FLAT_SLOPE: f64 = 1e-12;

/// Tunables for the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionSettings {
    /// Minimum measurements before a prediction is attempted.
    pub min_samples: usize,
    /// Projected change over `noise_window_days`, as a percentage of the
    /// threshold, below which the trajectory is stable.
    pub noise_floor_pct: f64,
    /// Window for the noise floor projection.
    pub noise_window_days: f64,
    /// Crossings further out than this are not reported.
    pub max_horizon_days: i64,
    /// Sample count at which confidence is no longer discounted.
    pub full_confidence_samples: usize,
    /// Fits with R² below this are treated as noisy.
    pub noisy_fit_r_squared: f64,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            min_samples: 3,
            noise_floor_pct: 2.0,
            noise_window_days: 90.0,
            max_horizon_days: 730,
            full_confidence_samples: 6,
            noisy_fit_r_squared: 0.5,
        }
    }
}

/// A forecast breach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Date the fitted line crosses the threshold.
    pub predicted_breach_date: Date,
    /// Days from the reference date to the crossing, never negative.
    pub days_until_breach: i64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Raw fit quality.
    pub r_squared: f64,
    /// Always `Deteriorating` for a reported prediction.
    pub current_trajectory: Trajectory,
    /// Threshold, or for noisy fits the last observation projected along
    /// the fitted slope to the breach date.
    pub predicted_value_at_breach: f64,
    /// Fitted change per day.
    pub slope_per_day: f64,
    /// Measurements fitted.
    pub sample_count: usize,
}

/// Why no prediction was produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoPredictionReason {
    /// Too few measurements.
    InsufficientData {
        /// Minimum required.
        required: usize,
        /// Available.
        actual: usize,
    },
    /// No threshold to cross.
    NoThreshold,
    /// Trend is not moving toward breach.
    NoTrendDetected {
        /// Observed trajectory.
        trajectory: Trajectory,
    },
    /// Crossing lies beyond the horizon.
    HorizonExceeded {
        /// Days to the crossing.
        days: i64,
        /// Configured horizon.
        max_days: i64,
    },
}

impl NoPredictionReason {
    /// Trajectory, when one was computed.
    #[must_use]
    pub fn trajectory(&self) -> Option<Trajectory> {
        match self {
            NoPredictionReason::NoTrendDetected { trajectory } => Some(*trajectory),
            NoPredictionReason::HorizonExceeded { .. } => Some(Trajectory::Deteriorating),
            _ => None,
        }
    }
}

impl From<NoPredictionReason> for AnalyticsError {
    fn from(reason: NoPredictionReason) -> Self {
        match reason {
            NoPredictionReason::InsufficientData { required, actual } => {
                AnalyticsError::InsufficientData { required, actual }
            }
            NoPredictionReason::NoThreshold => AnalyticsError::NoThreshold,
            NoPredictionReason::NoTrendDetected { trajectory } => {
                AnalyticsError::NoTrendDetected { trajectory }
            }
            NoPredictionReason::HorizonExceeded { days, max_days } => {
                AnalyticsError::HorizonExceeded { days, max_days }
            }
        }
    }
}

/// Result of a prediction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PredictionOutcome {
    /// A breach is forecast.
    Predicted(PredictionResult),
    /// No forecast, with the reason.
    NoPrediction(NoPredictionReason),
}

impl PredictionOutcome {
    /// The forecast, if any.
    #[must_use]
    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            PredictionOutcome::Predicted(p) => Some(p),
            PredictionOutcome::NoPrediction(_) => None,
        }
    }

    /// The reason no forecast was made, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&NoPredictionReason> {
        match self {
            PredictionOutcome::Predicted(_) => None,
            PredictionOutcome::NoPrediction(r) => Some(r),
        }
    }

    /// Trajectory, when a fit was possible.
    #[must_use]
    pub fn trajectory(&self) -> Option<Trajectory> {
        match self {
            PredictionOutcome::Predicted(p) => Some(p.current_trajectory),
            PredictionOutcome::NoPrediction(r) => r.trajectory(),
        }
    }
}

/// Linear-trend breach predictor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BreachPredictor {
    settings: PredictionSettings,
    evaluator: ThresholdEvaluator,
}

/// Fit plus the anchor it was computed against.
struct Trend {
    fit: LinearFit,
    first_date: Date,
    last_x: f64,
    last_value: f64,
    trajectory: Trajectory,
}

impl BreachPredictor {
    /// Creates a predictor; the evaluator supplies the equality tolerance.
    #[must_use]
    pub fn new(settings: PredictionSettings, evaluator: ThresholdEvaluator) -> Self {
        Self {
            settings,
            evaluator,
        }
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &PredictionSettings {
        &self.settings
    }

    /// Predicts the breach, counting days from the first measurement.
    ///
    /// `predicted_breach_date = first_measurement_date + days_until_breach`.
    #[must_use]
    pub fn predict(
        &self,
        history: &[Observation],
        threshold: Option<f64>,
        operator: Option<ThresholdOperator>,
    ) -> PredictionOutcome {
        self.run(history, threshold, operator, None)
    }

    /// Predicts the breach, counting days from `as_of`.
    ///
    /// A crossing already in the past reports zero days.
    #[must_use]
    pub fn predict_as_of(
        &self,
        history: &[Observation],
        threshold: Option<f64>,
        operator: Option<ThresholdOperator>,
        as_of: Date,
    ) -> PredictionOutcome {
        self.run(history, threshold, operator, Some(as_of))
    }

    /// Classifies the trajectory without solving for a crossing.
    #[must_use]
    pub fn trajectory(
        &self,
        history: &[Observation],
        threshold: f64,
        operator: ThresholdOperator,
    ) -> Option<Trajectory> {
        self.fit_trend(history, threshold, operator)
            .ok()
            .map(|t| t.trajectory)
    }

    fn run(
        &self,
        history: &[Observation],
        threshold: Option<f64>,
        operator: Option<ThresholdOperator>,
        as_of: Option<Date>,
    ) -> PredictionOutcome {
        let (Some(threshold), Some(operator)) = (threshold, operator) else {
            return PredictionOutcome::NoPrediction(NoPredictionReason::NoThreshold);
        };

        let trend = match self.fit_trend(history, threshold, operator) {
            Ok(trend) => trend,
            Err(reason) => return PredictionOutcome::NoPrediction(reason),
        };

        if trend.trajectory != Trajectory::Deteriorating {
            return PredictionOutcome::NoPrediction(NoPredictionReason::NoTrendDetected {
                trajectory: trend.trajectory,
            });
        }

        let target = self.crossing_target(&trend, threshold, operator);
        let solved_x = match trend.fit.solve_for(target) {
            Ok(x) => x,
            Err(_) => {
                return PredictionOutcome::NoPrediction(NoPredictionReason::NoTrendDetected {
                    trajectory: Trajectory::Stable,
                })
            }
        };

        let days_from_first = solved_x.max(0.0).round();
        let offset = as_of.map_or(0.0, |d| trend.first_date.days_between(&d) as f64);
        let days_until = (days_from_first - offset).max(0.0);

        if days_until > self.settings.max_horizon_days as f64 {
            log::debug!(
                "breach crossing {days_until:.0} days out exceeds {}-day horizon",
                self.settings.max_horizon_days
            );
            return PredictionOutcome::NoPrediction(NoPredictionReason::HorizonExceeded {
                days: days_until as i64,
                max_days: self.settings.max_horizon_days,
            });
        }

        let days_from_first = days_from_first as i64;
        let days_until_breach = days_until as i64;
        let predicted_breach_date = trend.first_date.add_days(days_from_first);

        let r_squared = trend.fit.r_squared;
        let sample_factor = (trend.fit.n as f64
            / self.settings.full_confidence_samples.max(1) as f64)
            .min(1.0);
        let confidence = (r_squared * sample_factor).clamp(0.0, 1.0);

        // the fitted line meets the target by construction, so noisy fits
        // project from the last observation along the fitted slope
        let predicted_value_at_breach = if r_squared < self.settings.noisy_fit_r_squared {
            trend.last_value + trend.fit.slope * (days_from_first as f64 - trend.last_x)
        } else {
            target
        };

        log::debug!(
            "predicted breach on {predicted_breach_date} (slope {:.4e}/day, r2 {r_squared:.3}, n {}, last x {})",
            trend.fit.slope,
            trend.fit.n,
            trend.last_x
        );

        PredictionOutcome::Predicted(PredictionResult {
            predicted_breach_date,
            days_until_breach,
            confidence,
            r_squared,
            current_trajectory: Trajectory::Deteriorating,
            predicted_value_at_breach,
            slope_per_day: trend.fit.slope,
            sample_count: trend.fit.n,
        })
    }

    fn fit_trend(
        &self,
        history: &[Observation],
        threshold: f64,
        operator: ThresholdOperator,
    ) -> Result<Trend, NoPredictionReason> {
        let insufficient = |actual| NoPredictionReason::InsufficientData {
            required: self.settings.min_samples,
            actual,
        };

        let mut sorted: Vec<Observation> = history
            .iter()
            .copied()
            .filter(|o| o.value.is_finite())
            .collect();
        if sorted.len() < self.settings.min_samples.max(2) {
            return Err(insufficient(sorted.len()));
        }
        sorted.sort_by_key(|o| o.date);

        let first_date = sorted[0].date;
        let xs: Vec<f64> = sorted
            .iter()
            .map(|o| first_date.days_between(&o.date) as f64)
            .collect();
        let ys: Vec<f64> = sorted.iter().map(|o| o.value).collect();

        let fit = match LinearFit::fit(&xs, &ys) {
            Ok(fit) => fit,
            Err(MathError::ZeroVariance) => return Err(insufficient(1)),
            Err(err) => {
                log::warn!("trend fit failed: {err}");
                return Err(insufficient(sorted.len()));
            }
        };
        let last_x = xs.last().copied().unwrap_or(0.0);
        let last_value = ys.last().copied().unwrap_or(fit.intercept);

        let trajectory = self.classify(&fit, last_x, threshold, operator);
        Ok(Trend {
            fit,
            first_date,
            last_x,
            last_value,
            trajectory,
        })
    }

    fn classify(
        &self,
        fit: &LinearFit,
        last_x: f64,
        threshold: f64,
        operator: ThresholdOperator,
    ) -> Trajectory {
        let projected = fit.slope.abs() * self.settings.noise_window_days;
        let floor = threshold.abs() * self.settings.noise_floor_pct / 100.0;
        if fit.slope.abs() < FLAT_SLOPE || projected < floor {
            return Trajectory::Stable;
        }

        let toward_breach = match operator {
            ThresholdOperator::Equal => {
                let deviation = fit.predict(last_x) - threshold;
                fit.slope * deviation >= 0.0
            }
            op => fit.slope * op.breach_direction() > 0.0,
        };

        if toward_breach {
            Trajectory::Deteriorating
        } else {
            Trajectory::Improving
        }
    }

    fn crossing_target(&self, trend: &Trend, threshold: f64, operator: ThresholdOperator) -> f64 {
        match operator {
            ThresholdOperator::Equal => {
                threshold + trend.fit.slope.signum() * self.evaluator.equality_tolerance(threshold)
            }
            _ => threshold,
        }
    }
}
