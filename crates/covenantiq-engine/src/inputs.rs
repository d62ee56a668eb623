//! Inputs accepted at the ingestion boundary.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use covenantiq_analytics::AnalyticsError;
use covenantiq_core::{
    Covenant, CovenantId, Date, LoanAgreement, LoanId, LoanLifecycle, ThresholdOperator, UserId,
};

use crate::error::EngineResult;

/// A measurement to record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeasurement {
    /// Test date.
    pub measurement_date: Date,
    /// Observed value.
    pub actual_value: f64,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// A covenant submitted with a new loan.
///
/// The operator arrives as raw text and is parsed strictly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCovenant {
    /// Identifier; generated when absent.
    #[serde(default)]
    pub id: Option<CovenantId>,
    /// Covenant kind, e.g. `leverage_ratio`.
    pub covenant_type: String,
    /// Display name.
    pub covenant_name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Threshold value.
    #[serde(default)]
    pub threshold_value: Option<f64>,
    /// Threshold operator text.
    #[serde(default)]
    pub threshold_operator: Option<String>,
    /// Test frequency.
    #[serde(default)]
    pub frequency: Option<String>,
    /// Next scheduled test.
    #[serde(default)]
    pub next_test_date: Option<Date>,
    /// Whether the covenant is tested.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A loan submitted by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    /// Identifier; generated when absent.
    #[serde(default)]
    pub id: Option<LoanId>,
    /// Owning user.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Title.
    pub title: String,
    /// Borrower.
    pub borrower_name: String,
    /// Principal.
    pub loan_amount: Decimal,
    /// ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Origination date.
    #[serde(default)]
    pub origination_date: Option<Date>,
    /// Maturity date.
    #[serde(default)]
    pub maturity_date: Option<Date>,
    /// Lifecycle.
    #[serde(default)]
    pub lifecycle: LoanLifecycle,
    /// Covenants.
    #[serde(default)]
    pub covenants: Vec<NewCovenant>,
}

impl NewCovenant {
    /// Builds a validated covenant for `loan_id`.
    ///
    /// # Errors
    ///
    /// Malformed operator text, an incomplete threshold pair or an empty
    /// name are rejected.
    pub fn into_covenant(self, loan_id: &LoanId) -> EngineResult<Covenant> {
        let operator = self
            .threshold_operator
            .as_deref()
            .map(ThresholdOperator::from_str)
            .transpose()
            .map_err(AnalyticsError::from)?;

        let mut covenant = Covenant::new(
            self.id.unwrap_or_else(CovenantId::generate),
            loan_id.clone(),
            self.covenant_type,
            self.covenant_name,
        );
        covenant.description = self.description;
        covenant.threshold_value = self.threshold_value;
        covenant.threshold_operator = operator;
        covenant.frequency = self.frequency;
        covenant.next_test_date = self.next_test_date;
        covenant.is_active = self.is_active;
        covenant.validate()?;
        Ok(covenant)
    }
}

impl NewLoan {
    /// Builds the loan and its covenants.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid covenant or loan field.
    pub fn into_parts(self, now: DateTime<Utc>) -> EngineResult<(LoanAgreement, Vec<Covenant>)> {
        let id = self.id.unwrap_or_else(LoanId::generate);
        let mut loan = LoanAgreement::new(id.clone(), self.title, self.borrower_name, self.loan_amount)
            .with_dates(self.origination_date, self.maturity_date)
            .with_lifecycle(self.lifecycle)
            .with_created_at(now);
        if let Some(user) = self.user_id {
            loan = loan.with_user(user);
        }
        if let Some(currency) = self.currency {
            loan.currency = currency;
        }
        loan.validate()?;

        let covenants = self
            .covenants
            .into_iter()
            .map(|c| c.into_covenant(&id))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok((loan, covenants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn new_loan(operator: Option<&str>, value: Option<f64>) -> NewLoan {
        serde_json::from_value(serde_json::json!({
            "title": "Acme Term Loan",
            "borrower_name": "Acme Corp",
            "loan_amount": 5000000,
            "covenants": [{
                "covenant_type": "leverage_ratio",
                "covenant_name": "Max Leverage",
                "threshold_value": value,
                "threshold_operator": operator,
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_word_operator_accepted() {
        let (loan, covenants) = new_loan(Some("less_or_equal"), Some(3.5))
            .into_parts(Utc::now())
            .unwrap();
        assert!(loan.id.as_str().starts_with("loan"));
        assert_eq!(covenants[0].loan_id, loan.id);
        assert_eq!(
            covenants[0].threshold(),
            Some((ThresholdOperator::LessOrEqual, 3.5))
        );
    }

    #[test]
    fn test_malformed_operator_rejected() {
        let err = new_loan(Some("at most"), Some(3.5))
            .into_parts(Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Analytics(AnalyticsError::InvalidOperator { .. })
        ));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_incomplete_threshold_rejected() {
        let err = new_loan(None, Some(3.5)).into_parts(Utc::now()).unwrap_err();
        assert!(err.is_client_error());
    }
}
