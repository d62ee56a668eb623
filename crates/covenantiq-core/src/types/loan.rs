//! Loan agreement entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Date, LoanId, UserId};
use crate::error::{CoreError, CoreResult};

/// Contractual lifecycle of a loan, independent of covenant compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanLifecycle {
    /// Outstanding and monitored.
    #[default]
    Active,
    /// Repaid at maturity.
    Matured,
    /// In default.
    Defaulted,
}

impl fmt::Display for LoanLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoanLifecycle::Active => "active",
            LoanLifecycle::Matured => "matured",
            LoanLifecycle::Defaulted => "defaulted",
        })
    }
}

impl FromStr for LoanLifecycle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LoanLifecycle::Active),
            "matured" => Ok(LoanLifecycle::Matured),
            "defaulted" => Ok(LoanLifecycle::Defaulted),
            _ => Err(CoreError::invalid_enum("loan lifecycle", s)),
        }
    }
}

/// A loan agreement owning a set of covenants.
///
/// The derived compliance `status` and `covenant_count` are not stored here;
/// they are computed from the covenants when a view is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanAgreement {
    /// Loan identifier.
    pub id: LoanId,
    /// Owning user, if scoped.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Agreement title.
    pub title: String,
    /// Borrower legal name.
    pub borrower_name: String,
    /// Principal amount.
    pub loan_amount: Decimal,
    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Origination date.
    #[serde(default)]
    pub origination_date: Option<Date>,
    /// Maturity date.
    #[serde(default)]
    pub maturity_date: Option<Date>,
    /// Contractual lifecycle.
    #[serde(default)]
    pub lifecycle: LoanLifecycle,
    /// When the agreement was ingested.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl LoanAgreement {
    /// Creates an active loan with the given identity and principal.
    pub fn new(
        id: impl Into<LoanId>,
        title: impl Into<String>,
        borrower_name: impl Into<String>,
        loan_amount: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: None,
            title: title.into(),
            borrower_name: borrower_name.into(),
            loan_amount,
            currency: default_currency(),
            origination_date: None,
            maturity_date: None,
            lifecycle: LoanLifecycle::Active,
            created_at: Utc::now(),
        }
    }

    /// Sets the owning user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets origination and maturity dates.
    #[must_use]
    pub fn with_dates(mut self, origination: Option<Date>, maturity: Option<Date>) -> Self {
        self.origination_date = origination;
        self.maturity_date = maturity;
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Sets the lifecycle.
    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: LoanLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Whether the loan is monitored at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle == LoanLifecycle::Active
    }

    /// Whether the loan was outstanding on `date`.
    ///
    /// A loan counts from its origination date (or creation date when none is
    /// recorded) until its maturity date. Only active loans count.
    #[must_use]
    pub fn is_outstanding_on(&self, date: Date) -> bool {
        if !self.is_active() {
            return false;
        }
        let start = self
            .origination_date
            .unwrap_or_else(|| Date::from(self.created_at.date_naive()));
        if start > date {
            return false;
        }
        self.maturity_date.map_or(true, |m| m >= date)
    }

    /// Whether this loan belongs to `user`, or no scoping is requested.
    #[must_use]
    pub fn is_visible_to(&self, user: Option<&UserId>) -> bool {
        match user {
            None => true,
            Some(u) => self.user_id.as_ref() == Some(u),
        }
    }

    /// Validates descriptive fields.
    pub fn validate(&self) -> CoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::invalid_field("title", "must not be empty"));
        }
        if self.loan_amount.is_sign_negative() {
            return Err(CoreError::invalid_field("loan_amount", "must not be negative"));
        }
        if let (Some(start), Some(end)) = (self.origination_date, self.maturity_date) {
            if end < start {
                return Err(CoreError::invalid_field(
                    "maturity_date",
                    format!("{end} precedes origination {start}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> Date {
        Date::parse(s).unwrap()
    }

    #[test]
    fn test_outstanding_window() {
        let loan = LoanAgreement::new("l1", "Term Loan A", "Acme", dec!(1_000_000))
            .with_dates(Some(date("2024-03-01")), Some(date("2026-03-01")));
        assert!(!loan.is_outstanding_on(date("2024-02-29")));
        assert!(loan.is_outstanding_on(date("2024-03-01")));
        assert!(loan.is_outstanding_on(date("2026-03-01")));
        assert!(!loan.is_outstanding_on(date("2026-03-02")));

        let matured = loan.with_lifecycle(LoanLifecycle::Matured);
        assert!(!matured.is_outstanding_on(date("2025-01-01")));
    }

    #[test]
    fn test_validation() {
        let mut loan = LoanAgreement::new("l1", "  ", "Acme", dec!(10));
        assert!(loan.validate().is_err());
        loan.title = "Revolver".into();
        assert!(loan.validate().is_ok());
        loan.loan_amount = dec!(-1);
        assert!(loan.validate().is_err());
    }

    #[test]
    fn test_user_scope() {
        let loan = LoanAgreement::new("l1", "A", "B", dec!(1)).with_user("u1");
        assert!(loan.is_visible_to(None));
        assert!(loan.is_visible_to(Some(&UserId::new("u1"))));
        assert!(!loan.is_visible_to(Some(&UserId::new("u2"))));
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"id":"l9","title":"Bridge","borrower_name":"Zeta","loan_amount":2500000.0}"#;
        let loan: LoanAgreement = serde_json::from_str(json).unwrap();
        assert_eq!(loan.currency, "USD");
        assert_eq!(loan.lifecycle, LoanLifecycle::Active);
        assert_eq!(loan.loan_amount, dec!(2500000));
    }
}
