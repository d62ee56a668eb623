//! Covenant and covenant measurement entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ComplianceStatus, CovenantId, Date, LoanId, MeasurementId, ThresholdOperator};
use crate::error::{CoreError, CoreResult};

/// A contractual financial test attached to one loan agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Covenant {
    /// Covenant identifier.
    pub id: CovenantId,
    /// Owning loan agreement.
    #[serde(rename = "loan_agreement_id", alias = "loan_id")]
    pub loan_id: LoanId,
    /// Category, e.g. `leverage_ratio`.
    pub covenant_type: String,
    /// Display name.
    pub covenant_name: String,
    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Threshold the measured value is compared against.
    #[serde(default)]
    pub threshold_value: Option<f64>,
    /// Pass condition.
    #[serde(default)]
    pub threshold_operator: Option<ThresholdOperator>,
    /// Test frequency, e.g. `quarterly`.
    #[serde(default)]
    pub frequency: Option<String>,
    /// Next scheduled test date.
    #[serde(default)]
    pub next_test_date: Option<Date>,
    /// Inactive covenants are excluded from loan status and alerts.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Covenant {
    /// Creates an active covenant with no threshold.
    pub fn new(
        id: impl Into<CovenantId>,
        loan_id: impl Into<LoanId>,
        covenant_type: impl Into<String>,
        covenant_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            loan_id: loan_id.into(),
            covenant_type: covenant_type.into(),
            covenant_name: covenant_name.into(),
            description: None,
            threshold_value: None,
            threshold_operator: None,
            frequency: None,
            next_test_date: None,
            is_active: true,
        }
    }

    /// Sets the threshold pair.
    #[must_use]
    pub fn with_threshold(mut self, operator: ThresholdOperator, value: f64) -> Self {
        self.threshold_operator = Some(operator);
        self.threshold_value = Some(value);
        self
    }

    /// Sets the test frequency.
    #[must_use]
    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    /// The defined threshold, if both halves are present.
    #[must_use]
    pub fn threshold(&self) -> Option<(ThresholdOperator, f64)> {
        match (self.threshold_operator, self.threshold_value) {
            (Some(op), Some(value)) => Some((op, value)),
            _ => None,
        }
    }

    /// Checks the threshold pairing invariant.
    pub fn validate(&self) -> CoreResult<()> {
        if self.threshold_operator.is_some() != self.threshold_value.is_some() {
            return Err(CoreError::IncompleteThreshold {
                covenant_id: self.id.to_string(),
            });
        }
        if let Some(v) = self.threshold_value {
            if !v.is_finite() {
                return Err(CoreError::invalid_field("threshold_value", "must be finite"));
            }
        }
        if self.covenant_name.trim().is_empty() {
            return Err(CoreError::invalid_field("covenant_name", "must not be empty"));
        }
        Ok(())
    }
}

/// One recorded test result for a covenant. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovenantMeasurement {
    /// Measurement identifier.
    pub id: MeasurementId,
    /// Covenant tested.
    pub covenant_id: CovenantId,
    /// Test date; unique per covenant.
    pub measurement_date: Date,
    /// Measured value.
    pub actual_value: f64,
    /// Threshold in force at test time.
    pub threshold_value: Option<f64>,
    /// Operator in force at test time.
    pub threshold_operator: Option<ThresholdOperator>,
    /// Status derived at test time.
    pub status: ComplianceStatus,
    /// Safe margin in threshold units; negative when in breach.
    pub distance_to_breach: Option<f64>,
    /// Analyst notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// When the row was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl CovenantMeasurement {
    /// The threshold snapshot, if both halves were present.
    #[must_use]
    pub fn threshold(&self) -> Option<(ThresholdOperator, f64)> {
        match (self.threshold_operator, self.threshold_value) {
            (Some(op), Some(value)) => Some((op, value)),
            _ => None,
        }
    }
}
