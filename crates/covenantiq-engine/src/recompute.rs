//! Portfolio recompute orchestration.
//!
//! A recompute has two phases. The fetch phase (in the engine) loads loans,
//! covenants and history into [`LoanBatch`]es. The compute phase runs one
//! task per loan: evaluate, predict, and apply alert candidates. A failing
//! covenant or a panicking loan task is recorded in the report and the rest
//! of the batch carries on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use covenantiq_analytics::{BreachPredictor, Observation};
use covenantiq_core::{
    Covenant, CovenantId, CovenantMeasurement, Date, LoanAgreement, LoanId, MeasurementId,
};

use crate::alert_generator::{candidates, AlertGenerator, AlertOutcome};

// =============================================================================
// REPORT
// =============================================================================

/// Which covenants a recompute considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeMode {
    /// Every active covenant.
    All,
    /// Only covenants whose latest measurement changed since their last
    /// successful evaluation.
    Changed,
    /// Changed covenants plus those with an open alert, whose countdown
    /// moves with the evaluation date.
    Due,
}

/// Kind of entity that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A whole loan task failed.
    Loan,
    /// A single covenant failed.
    Covenant,
}

/// An entity the recompute could not finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntity {
    /// Loan or covenant id.
    pub entity_id: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Error message.
    pub error: String,
}

/// Best-effort result of a recompute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecomputeReport {
    /// Loans whose task ran to completion.
    pub loans_processed: usize,
    /// Covenants evaluated.
    pub covenants_evaluated: usize,
    /// New alert rows.
    pub alerts_opened: usize,
    /// Material updates to open alerts.
    pub alerts_updated: usize,
    /// Open alerts whose countdown moved without a material change.
    #[serde(default)]
    pub alerts_refreshed: usize,
    /// Resolved alerts re-opened.
    pub alerts_reopened: usize,
    /// Failures, in loan order.
    pub failed: Vec<FailedEntity>,
}

impl RecomputeReport {
    fn record(&mut self, outcome: AlertOutcome) {
        match outcome {
            AlertOutcome::Unchanged => {}
            AlertOutcome::Opened => self.alerts_opened += 1,
            AlertOutcome::Updated => self.alerts_updated += 1,
            AlertOutcome::Refreshed => self.alerts_refreshed += 1,
            AlertOutcome::Reopened => self.alerts_reopened += 1,
        }
    }

    fn merge(&mut self, other: RecomputeReport) {
        self.loans_processed += other.loans_processed;
        self.covenants_evaluated += other.covenants_evaluated;
        self.alerts_opened += other.alerts_opened;
        self.alerts_updated += other.alerts_updated;
        self.alerts_refreshed += other.alerts_refreshed;
        self.alerts_reopened += other.alerts_reopened;
        self.failed.extend(other.failed);
    }

    /// Whether every entity completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of failed entities.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.entity_id.as_str()).collect()
    }
}

// =============================================================================
// COMPUTE PHASE
// =============================================================================

/// One loan with the covenants to evaluate and their history (oldest first).
#[derive(Debug, Clone)]
pub(crate) struct LoanBatch {
    pub loan: LoanAgreement,
    pub covenants: Vec<(Covenant, Vec<CovenantMeasurement>)>,
}

/// Covenant and the measurement it was last evaluated against.
pub(crate) type EvaluatedMark = (CovenantId, MeasurementId);

struct LoanResult {
    report: RecomputeReport,
    evaluated: Vec<EvaluatedMark>,
}

async fn process_loan(
    batch: LoanBatch,
    predictor: BreachPredictor,
    generator: Arc<AlertGenerator>,
    as_of: Date,
    now: DateTime<Utc>,
) -> LoanResult {
    let mut report = RecomputeReport {
        loans_processed: 1,
        ..RecomputeReport::default()
    };
    let mut evaluated = Vec::new();

    for (covenant, history) in &batch.covenants {
        let history: Vec<&CovenantMeasurement> = history
            .iter()
            .filter(|m| m.measurement_date <= as_of)
            .collect();
        let Some(latest) = history.last().copied() else {
            continue;
        };
        report.covenants_evaluated += 1;

        let observations: Vec<Observation> =
            history.iter().map(|m| Observation::from(*m)).collect();
        let outcome = predictor.predict_as_of(
            &observations,
            covenant.threshold_value,
            covenant.threshold_operator,
            as_of,
        );

        let mut ok = true;
        for candidate in candidates(&batch.loan, covenant, latest, &outcome, generator.config()) {
            match generator.process(&candidate, now).await {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    error!(loan_id = %batch.loan.id, covenant_id = %covenant.id, error = %e, "covenant recompute failed");
                    report.failed.push(FailedEntity {
                        entity_id: covenant.id.to_string(),
                        kind: EntityKind::Covenant,
                        error: e.to_string(),
                    });
                    ok = false;
                }
            }
        }
        if ok {
            evaluated.push((covenant.id.clone(), latest.id.clone()));
        }
    }

    debug!(loan_id = %batch.loan.id, covenants = report.covenants_evaluated, "loan recomputed");
    LoanResult { report, evaluated }
}

/// Runs one task per loan and folds the results.
pub(crate) async fn run_batches(
    batches: Vec<LoanBatch>,
    predictor: BreachPredictor,
    generator: Arc<AlertGenerator>,
    as_of: Date,
    now: DateTime<Utc>,
) -> (RecomputeReport, Vec<EvaluatedMark>) {
    let handles: Vec<(LoanId, JoinHandle<LoanResult>)> = batches
        .into_iter()
        .map(|batch| {
            let loan_id = batch.loan.id.clone();
            let task = tokio::spawn(process_loan(
                batch,
                predictor,
                Arc::clone(&generator),
                as_of,
                now,
            ));
            (loan_id, task)
        })
        .collect();

    let mut report = RecomputeReport::default();
    let mut evaluated = Vec::new();
    for (loan_id, handle) in handles {
        match handle.await {
            Ok(result) => {
                report.merge(result.report);
                evaluated.extend(result.evaluated);
            }
            Err(e) => {
                error!(loan_id = %loan_id, error = %e, "loan recompute task failed");
                report.failed.push(FailedEntity {
                    entity_id: loan_id.to_string(),
                    kind: EntityKind::Loan,
                    error: e.to_string(),
                });
            }
        }
    }
    (report, evaluated)
}
