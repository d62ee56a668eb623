//! Threshold evaluation.
//!
//! Classifies a measured value against a covenant threshold:
//!
//! | Condition | Status |
//! |---|---|
//! | operator or threshold absent | `unknown` |
//! | comparison fails | `breach` |
//! | passes, `0 < distance < band` | `warning` |
//! | otherwise | `compliant` |
//!
//! `distance` is the safe margin in threshold units and `band` is
//! `warning_band_pct` of the threshold magnitude. A value exactly on an
//! inclusive threshold has zero margin and is `compliant`. Equality covenants
//! pass within `equality_tolerance_pct` and never report `warning`.

use covenantiq_core::{ComplianceStatus, Covenant, ThresholdOperator};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsResult;

/// Tunables for the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Warning band as a percentage of threshold magnitude.
    pub warning_band_pct: f64,
    /// Pass band for `=` covenants as a percentage of threshold magnitude.
    pub equality_tolerance_pct: f64,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            warning_band_pct: 10.0,
            equality_tolerance_pct: 5.0,
        }
    }
}

/// Status plus margin for one measured value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Derived status.
    pub status: ComplianceStatus,
    /// Safe margin in threshold units, negative when breached.
    pub distance_to_breach: Option<f64>,
}

/// Stateless threshold evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThresholdEvaluator {
    settings: EvaluationSettings,
}

impl ThresholdEvaluator {
    /// Creates an evaluator with the given settings.
    #[must_use]
    pub fn new(settings: EvaluationSettings) -> Self {
        Self { settings }
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    /// Absolute pass band for `=` covenants.
    #[must_use]
    pub fn equality_tolerance(&self, threshold: f64) -> f64 {
        threshold.abs() * self.settings.equality_tolerance_pct / 100.0
    }

    /// Absolute warning band.
    #[must_use]
    pub fn warning_band(&self, threshold: f64) -> f64 {
        threshold.abs() * self.settings.warning_band_pct / 100.0
    }

    /// Classifies `actual` against `(operator, threshold)`.
    ///
    /// Total over its inputs: non-finite values yield `unknown`.
    #[must_use]
    pub fn evaluate(
        &self,
        operator: Option<ThresholdOperator>,
        threshold: Option<f64>,
        actual: f64,
    ) -> ComplianceStatus {
        self.evaluate_detailed(operator, threshold, actual).status
    }

    /// Like [`evaluate`](Self::evaluate) but parses a raw operator string.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::InvalidOperator` for malformed operator text.
    pub fn evaluate_raw(
        &self,
        operator: Option<&str>,
        threshold: Option<f64>,
        actual: f64,
    ) -> AnalyticsResult<ComplianceStatus> {
        let op = operator
            .map(str::parse::<ThresholdOperator>)
            .transpose()?;
        Ok(self.evaluate(op, threshold, actual))
    }

    /// Status and margin for `actual`.
    #[must_use]
    pub fn evaluate_detailed(
        &self,
        operator: Option<ThresholdOperator>,
        threshold: Option<f64>,
        actual: f64,
    ) -> Evaluation {
        let (Some(op), Some(threshold)) = (operator, threshold) else {
            return Evaluation {
                status: ComplianceStatus::Unknown,
                distance_to_breach: None,
            };
        };
        if !actual.is_finite() || !threshold.is_finite() {
            return Evaluation {
                status: ComplianceStatus::Unknown,
                distance_to_breach: None,
            };
        }

        let tolerance = self.equality_tolerance(threshold);
        let distance = self.distance_to_breach(op, threshold, actual);

        let status = if !op.is_satisfied(actual, threshold, tolerance) {
            ComplianceStatus::Breach
        } else if op == ThresholdOperator::Equal {
            ComplianceStatus::Compliant
        } else if distance > 0.0 && distance < self.warning_band(threshold) {
            ComplianceStatus::Warning
        } else {
            ComplianceStatus::Compliant
        };

        Evaluation {
            status,
            distance_to_breach: Some(distance),
        }
    }

    /// Signed safe margin of `actual` against the threshold.
    ///
    /// Upper limits: `threshold - actual`. Lower limits: `actual - threshold`.
    /// Equality: `tolerance - |actual - threshold|`.
    #[must_use]
    pub fn distance_to_breach(&self, operator: ThresholdOperator, threshold: f64, actual: f64) -> f64 {
        match operator {
            ThresholdOperator::LessOrEqual | ThresholdOperator::LessThan => threshold - actual,
            ThresholdOperator::GreaterOrEqual | ThresholdOperator::GreaterThan => actual - threshold,
            ThresholdOperator::Equal => self.equality_tolerance(threshold) - (actual - threshold).abs(),
        }
    }

    /// Evaluates `actual` against a covenant's current threshold.
    #[must_use]
    pub fn evaluate_covenant(&self, covenant: &Covenant, actual: f64) -> Evaluation {
        self.evaluate_detailed(covenant.threshold_operator, covenant.threshold_value, actual)
    }
}

/// Evaluates with default settings (10% warning band).
#[must_use]
pub fn evaluate(
    operator: Option<ThresholdOperator>,
    threshold: Option<f64>,
    actual: f64,
) -> ComplianceStatus {
    ThresholdEvaluator::default().evaluate(operator, threshold, actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use ComplianceStatus::*;
    use ThresholdOperator::*;

    #[test]
    fn test_reference_cases() {
        assert_eq!(evaluate(Some(LessOrEqual), Some(3.0), 2.5), Compliant);
        assert_eq!(evaluate(Some(LessOrEqual), Some(3.0), 3.2), Breach);
        assert_eq!(evaluate(Some(LessOrEqual), Some(3.0), 3.0), Compliant);
        assert_eq!(evaluate(None, None, 2.5), Unknown);
    }

    #[test]
    fn test_half_defined_threshold_is_unknown() {
        assert_eq!(evaluate(Some(LessOrEqual), None, 2.5), Unknown);
        assert_eq!(evaluate(None, Some(3.0), 2.5), Unknown);
    }

    #[test]
    fn test_warning_band_upper_limit() {
        // band = 0.3 around a 3.0 ceiling
        assert_eq!(evaluate(Some(LessOrEqual), Some(3.0), 2.8), Warning);
        assert_eq!(evaluate(Some(LessOrEqual), Some(3.0), 2.6), Compliant);
        assert_eq!(evaluate(Some(LessThan), Some(3.0), 2.95), Warning);
        assert_eq!(evaluate(Some(LessThan), Some(3.0), 3.0), Breach);
    }

    #[test]
    fn test_warning_band_lower_limit() {
        // band = 0.125 above a 1.25 floor
        assert_eq!(evaluate(Some(GreaterOrEqual), Some(1.25), 1.30), Warning);
        assert_eq!(evaluate(Some(GreaterOrEqual), Some(1.25), 1.50), Compliant);
        assert_eq!(evaluate(Some(GreaterOrEqual), Some(1.25), 1.25), Compliant);
        assert_eq!(evaluate(Some(GreaterThan), Some(1.25), 1.25), Breach);
        assert_eq!(evaluate(Some(GreaterOrEqual), Some(1.25), 1.0), Breach);
    }

    #[test]
    fn test_equality_never_warns() {
        assert_eq!(evaluate(Some(Equal), Some(100.0), 104.0), Compliant);
        assert_eq!(evaluate(Some(Equal), Some(100.0), 99.9), Compliant);
        assert_eq!(evaluate(Some(Equal), Some(100.0), 106.0), Breach);
        assert_eq!(evaluate(Some(Equal), Some(100.0), 94.0), Breach);
    }

    #[test]
    fn test_configurable_band() {
        let evaluator = ThresholdEvaluator::new(EvaluationSettings {
            warning_band_pct: 20.0,
            ..EvaluationSettings::default()
        });
        assert_eq!(evaluator.evaluate(Some(LessOrEqual), Some(3.0), 2.5), Warning);
        assert_eq!(evaluate(Some(LessOrEqual), Some(3.0), 2.5), Compliant);
    }

    #[test]
    fn test_distance_to_breach() {
        let e = ThresholdEvaluator::default();
        assert_relative_eq!(e.distance_to_breach(LessOrEqual, 3.0, 2.5), 0.5);
        assert_relative_eq!(e.distance_to_breach(LessOrEqual, 3.0, 3.2), -0.2, epsilon = 1e-12);
        assert_relative_eq!(e.distance_to_breach(GreaterOrEqual, 1.25, 1.5), 0.25);
        assert_relative_eq!(e.distance_to_breach(Equal, 100.0, 102.0), 3.0);

        let detail = e.evaluate_detailed(None, None, 1.0);
        assert!(detail.distance_to_breach.is_none());
    }

    #[test]
    fn test_raw_operator() {
        let e = ThresholdEvaluator::default();
        assert_eq!(e.evaluate_raw(Some("<="), Some(3.0), 3.2).unwrap(), Breach);
        assert_eq!(e.evaluate_raw(Some("greater_than"), Some(1.0), 2.0).unwrap(), Compliant);
        assert_eq!(e.evaluate_raw(None, Some(3.0), 3.2).unwrap(), Unknown);
        assert_eq!(
            e.evaluate_raw(Some("=<"), Some(3.0), 1.0),
            Err(AnalyticsError::invalid_operator("=<"))
        );
    }

    #[test]
    fn test_non_finite_actual_is_unknown() {
        assert_eq!(evaluate(Some(LessOrEqual), Some(3.0), f64::NAN), Unknown);
        assert_eq!(evaluate(Some(GreaterThan), Some(3.0), f64::INFINITY), Unknown);
    }

    fn any_operator() -> impl Strategy<Value = Option<ThresholdOperator>> {
        prop_oneof![
            Just(None),
            Just(Some(LessOrEqual)),
            Just(Some(LessThan)),
            Just(Some(GreaterOrEqual)),
            Just(Some(GreaterThan)),
            Just(Some(Equal)),
        ]
    }

    proptest! {
        #[test]
        fn prop_evaluate_total_and_deterministic(
            op in any_operator(),
            threshold in proptest::option::of(-1.0e6f64..1.0e6),
            actual in -1.0e6f64..1.0e6,
        ) {
            let first = evaluate(op, threshold, actual);
            let second = evaluate(op, threshold, actual);
            prop_assert_eq!(first, second);
            if op.is_none() || threshold.is_none() {
                prop_assert_eq!(first, Unknown);
            }
        }

        #[test]
        fn prop_breach_iff_comparison_fails(
            threshold in 0.1f64..100.0,
            actual in 0.0f64..200.0,
        ) {
            let status = evaluate(Some(LessOrEqual), Some(threshold), actual);
            prop_assert_eq!(status == Breach, actual > threshold);
        }
    }
}
