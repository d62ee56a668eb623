//! Alert entity and its enumerations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{AlertId, CovenantId, Date, LoanId};
use crate::error::CoreError;

/// Alert severity, ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Low,
    /// Needs attention.
    Medium,
    /// Critical.
    High,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        })
    }
}

impl FromStr for AlertSeverity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" | "critical" => Ok(AlertSeverity::High),
            _ => Err(CoreError::invalid_enum("alert severity", s)),
        }
    }
}

/// What raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// The latest measurement already breaches.
    Breach,
    /// A breach is predicted within the alert horizon.
    Prediction,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertType::Breach => "breach",
            AlertType::Prediction => "prediction",
        })
    }
}

/// Deduplication key: at most one open alert per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    /// Covenant the alert is about.
    pub covenant_id: CovenantId,
    /// Alert kind.
    pub alert_type: AlertType,
}

impl AlertKey {
    /// Creates a key.
    pub fn new(covenant_id: impl Into<CovenantId>, alert_type: AlertType) -> Self {
        Self {
            covenant_id: covenant_id.into(),
            alert_type,
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.covenant_id, self.alert_type)
    }
}

/// A persisted alert.
///
/// `version` increases on every write and guards compare-and-swap updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert identifier.
    pub id: AlertId,
    /// Covenant reference; cleared when the covenant is removed.
    pub covenant_id: Option<CovenantId>,
    /// Loan reference; cleared when the loan is removed.
    #[serde(rename = "loan_agreement_id")]
    pub loan_id: Option<LoanId>,
    /// Alert kind.
    pub alert_type: AlertType,
    /// Severity.
    pub severity: AlertSeverity,
    /// Short headline.
    pub title: String,
    /// Human readable detail.
    pub message: String,
    /// Forecast breach date, for prediction alerts.
    pub predicted_breach_date: Option<Date>,
    /// Days from evaluation to forecast breach.
    pub days_until_breach: Option<i64>,
    /// Prediction confidence in [0, 1].
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Read flag.
    pub is_read: bool,
    /// Resolved flag.
    pub is_resolved: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
    /// When a user resolved it.
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Write counter.
    pub version: u64,
}

impl Alert {
    /// Whether the alert is open (not resolved).
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.is_resolved
    }

    /// Deduplication key, if the covenant reference survives.
    #[must_use]
    pub fn key(&self) -> Option<AlertKey> {
        self.covenant_id
            .as_ref()
            .map(|c| AlertKey::new(c.clone(), self.alert_type))
    }

    /// Whether the alert is unread and still open.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        !self.is_read && !self.is_resolved
    }

    /// Whether the alert counts as critical.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.is_open() && self.severity == AlertSeverity::High
    }
}
