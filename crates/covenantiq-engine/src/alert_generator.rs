//! Alert generation.
//!
//! Each `(covenant, alert type)` key moves through a small state machine:
//!
//! ```text
//! none ──trigger──> open ──user resolves──> resolved
//!                   │  ^                      │
//!                   └──┘ material change      └──newer evidence──> open
//! ```
//!
//! Non-material changes to an open alert refresh its countdown and
//! confidence in place without marking it unread.
//!
//! The generator never resolves an alert. Writes go through the store's
//! compare-and-swap so concurrent recomputes cannot create a second row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use covenantiq_analytics::PredictionOutcome;
use covenantiq_core::{
    Alert, AlertId, AlertKey, AlertSeverity, AlertType, ComplianceStatus, Covenant,
    CovenantMeasurement, Date, LoanAgreement,
};
use covenantiq_traits::config::AlertConfig;
use covenantiq_traits::storage::AlertStore;
use covenantiq_traits::TraitError;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// CANDIDATES
// =============================================================================

/// What the latest evaluation says an alert should look like.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    /// Deduplication key.
    pub key: AlertKey,
    /// Owning loan.
    pub loan: LoanAgreement,
    /// Severity.
    pub severity: AlertSeverity,
    /// Short title.
    pub title: String,
    /// Human-readable message.
    pub message: String,
    /// Breach date (measurement date for an actual breach).
    pub predicted_breach_date: Option<Date>,
    /// Days from evaluation to breach.
    pub days_until_breach: Option<i64>,
    /// Prediction confidence.
    pub confidence: Option<f64>,
    /// When the triggering measurement was recorded.
    pub evidence_at: DateTime<Utc>,
}

/// Maps status and days-to-breach onto a severity.
#[must_use]
pub fn severity_for(
    status: ComplianceStatus,
    days_until_breach: Option<i64>,
    config: &AlertConfig,
) -> AlertSeverity {
    let within = |limit: i64| days_until_breach.is_some_and(|d| d <= limit);
    if status == ComplianceStatus::Breach || within(config.high_days) {
        AlertSeverity::High
    } else if status == ComplianceStatus::Warning || within(config.medium_days) {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}

/// Alert candidates for one covenant given its latest measurement and
/// prediction outcome.
///
/// A covenant already in breach raises only a breach alert. Otherwise a
/// prediction within the horizon raises a prediction alert. Covenants
/// without a threshold raise nothing.
#[must_use]
pub fn candidates(
    loan: &LoanAgreement,
    covenant: &Covenant,
    latest: &CovenantMeasurement,
    outcome: &PredictionOutcome,
    config: &AlertConfig,
) -> Vec<AlertCandidate> {
    let Some((operator, threshold)) = covenant.threshold() else {
        return Vec::new();
    };

    if latest.status == ComplianceStatus::Breach {
        return vec![AlertCandidate {
            key: AlertKey::new(covenant.id.clone(), AlertType::Breach),
            loan: loan.clone(),
            severity: severity_for(latest.status, Some(0), config),
            title: format!("{} in breach", covenant.covenant_name),
            message: format!(
                "{}: {} measured {} against {} {} on {}",
                loan.title,
                covenant.covenant_name,
                latest.actual_value,
                operator,
                threshold,
                latest.measurement_date
            ),
            predicted_breach_date: Some(latest.measurement_date),
            days_until_breach: Some(0),
            confidence: None,
            evidence_at: latest.recorded_at,
        }];
    }

    match outcome {
        PredictionOutcome::Predicted(p) if p.days_until_breach <= config.horizon_days => {
            vec![AlertCandidate {
                key: AlertKey::new(covenant.id.clone(), AlertType::Prediction),
                loan: loan.clone(),
                severity: severity_for(latest.status, Some(p.days_until_breach), config),
                title: format!("{} breach predicted", covenant.covenant_name),
                message: format!(
                    "{}: {} projected to cross {} {} on {} ({} days, {:.0}% confidence)",
                    loan.title,
                    covenant.covenant_name,
                    operator,
                    threshold,
                    p.predicted_breach_date,
                    p.days_until_breach,
                    p.confidence * 100.0
                ),
                predicted_breach_date: Some(p.predicted_breach_date),
                days_until_breach: Some(p.days_until_breach),
                confidence: Some(p.confidence),
                evidence_at: latest.recorded_at,
            }]
        }
        _ => Vec::new(),
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Result of applying a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertOutcome {
    /// No write was needed.
    Unchanged,
    /// A new alert row was created.
    Opened,
    /// An open alert changed materially.
    Updated,
    /// An open alert's countdown or confidence moved without a material change.
    Refreshed,
    /// A resolved alert was re-opened.
    Reopened,
}

/// The write a candidate implies for the current row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Transition {
    Keep,
    Open(Alert),
    Update(Alert),
    Refresh(Alert),
    Reopen(Alert),
}

fn is_material(current: &Alert, candidate: &AlertCandidate, config: &AlertConfig) -> bool {
    if current.severity != candidate.severity {
        return true;
    }
    match (current.predicted_breach_date, candidate.predicted_breach_date) {
        (Some(a), Some(b)) => a.days_between(&b).abs() > config.material_shift_days,
        (None, None) => false,
        _ => true,
    }
}

fn needs_refresh(current: &Alert, candidate: &AlertCandidate) -> bool {
    current.days_until_breach != candidate.days_until_breach
        || current.predicted_breach_date != candidate.predicted_breach_date
        || current.confidence != candidate.confidence
}

fn apply_candidate(alert: &mut Alert, candidate: &AlertCandidate, now: DateTime<Utc>) {
    alert.loan_id = Some(candidate.loan.id.clone());
    alert.severity = candidate.severity;
    alert.title = candidate.title.clone();
    alert.message = candidate.message.clone();
    alert.predicted_breach_date = candidate.predicted_breach_date;
    alert.days_until_breach = candidate.days_until_breach;
    alert.confidence = candidate.confidence;
    alert.is_read = false;
    alert.updated_at = now;
}

pub(crate) fn transition(
    current: Option<&Alert>,
    candidate: &AlertCandidate,
    config: &AlertConfig,
    now: DateTime<Utc>,
) -> Transition {
    match current {
        None => {
            let mut alert = Alert {
                id: AlertId::generate(),
                covenant_id: Some(candidate.key.covenant_id.clone()),
                loan_id: Some(candidate.loan.id.clone()),
                alert_type: candidate.key.alert_type,
                severity: candidate.severity,
                title: String::new(),
                message: String::new(),
                predicted_breach_date: None,
                days_until_breach: None,
                confidence: None,
                is_read: false,
                is_resolved: false,
                created_at: now,
                updated_at: now,
                resolved_at: None,
                version: 0,
            };
            apply_candidate(&mut alert, candidate, now);
            Transition::Open(alert)
        }
        Some(existing) if existing.is_open() => {
            if is_material(existing, candidate, config) {
                let mut alert = existing.clone();
                apply_candidate(&mut alert, candidate, now);
                Transition::Update(alert)
            } else if needs_refresh(existing, candidate) {
                let mut alert = existing.clone();
                let is_read = alert.is_read;
                apply_candidate(&mut alert, candidate, now);
                alert.is_read = is_read;
                Transition::Refresh(alert)
            } else {
                Transition::Keep
            }
        }
        Some(existing) => {
            let newer = existing
                .resolved_at
                .map_or(true, |resolved| candidate.evidence_at > resolved);
            if !newer {
                return Transition::Keep;
            }
            let mut alert = existing.clone();
            apply_candidate(&mut alert, candidate, now);
            alert.is_resolved = false;
            alert.resolved_at = None;
            Transition::Reopen(alert)
        }
    }
}

// =============================================================================
// GENERATOR
// =============================================================================

/// Applies alert candidates to the alert store.
pub struct AlertGenerator {
    store: Arc<dyn AlertStore>,
    config: AlertConfig,
}

impl AlertGenerator {
    /// Create a generator over an alert store.
    pub fn new(store: Arc<dyn AlertStore>, config: AlertConfig) -> Self {
        Self { store, config }
    }

    /// The alert configuration.
    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Applies one candidate, retrying after a compare-and-swap conflict.
    pub async fn process(
        &self,
        candidate: &AlertCandidate,
        now: DateTime<Utc>,
    ) -> EngineResult<AlertOutcome> {
        let mut attempt = 0;
        loop {
            let current = self.store.find_by_key(&candidate.key).await?;
            let expected = current.as_ref().map(|a| a.version);

            let (alert, outcome) = match transition(current.as_ref(), candidate, &self.config, now) {
                Transition::Keep => return Ok(AlertOutcome::Unchanged),
                Transition::Open(a) => (a, AlertOutcome::Opened),
                Transition::Update(a) => (a, AlertOutcome::Updated),
                Transition::Refresh(a) => (a, AlertOutcome::Refreshed),
                Transition::Reopen(a) => (a, AlertOutcome::Reopened),
            };

            match self.store.upsert_if_version(&alert, expected).await {
                Ok(()) => {
                    debug!(key = %candidate.key, ?outcome, severity = %alert.severity, "alert written");
                    return Ok(outcome);
                }
                Err(TraitError::Conflict(reason)) => {
                    if attempt >= self.config.conflict_retries {
                        error!(key = %candidate.key, %reason, "alert write conflict, retries exhausted");
                        return Err(EngineError::ConcurrentAlertWriteConflict {
                            covenant_id: candidate.key.covenant_id.clone(),
                            alert_type: candidate.key.alert_type,
                        });
                    }
                    warn!(key = %candidate.key, %reason, "alert write conflict, retrying");
                    attempt += 1;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
}
