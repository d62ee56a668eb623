//! The covenant engine facade.
//!
//! Every read builds a [`PortfolioSnapshot`] from the stores and hands it to
//! the pure portfolio functions. Writes go straight to the stores; recording a
//! measurement re-evaluates that covenant's alerts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use covenantiq_analytics::{NoPredictionReason, Observation, Period, PredictionResult, TrendSeries};
use covenantiq_core::{
    Alert, AlertId, Covenant, CovenantId, CovenantMeasurement, Date, LoanAgreement, LoanId,
    MeasurementId, Trajectory, UserId,
};
use covenantiq_portfolio::analytics::{
    self, AlertFilter, CovenantTrends, PortfolioSummary, PortfolioTrends, PortfolioValue,
    RiskHeatmapItem,
};
use covenantiq_portfolio::search::{self, SearchResults};
use covenantiq_portfolio::types::{
    covenant_views_for_loan, loan_views, CovenantView, LoanView, PortfolioSnapshot,
};
use covenantiq_traits::config::EngineConfig;
use covenantiq_traits::storage::StorageProvider;
use covenantiq_traits::TraitError;

use crate::alert_generator::AlertGenerator;
use crate::context::CalcContext;
use crate::error::{EngineError, EngineResult};
use crate::inputs::{NewLoan, NewMeasurement};
use crate::recompute::{run_batches, LoanBatch, RecomputeMode, RecomputeReport};
use crate::scheduler;

// =============================================================================
// VIEWS
// =============================================================================

/// Prediction for one covenant, or why there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionView {
    /// Covenant predicted.
    pub covenant_id: CovenantId,
    /// The forecast, when one was made.
    pub prediction: Option<PredictionResult>,
    /// Reason code when no forecast was made.
    pub reason: Option<String>,
    /// Trajectory, when a trend could be fitted.
    pub trajectory: Option<Trajectory>,
    /// Human-readable explanation of the reason.
    pub message: Option<String>,
}

fn reason_code(reason: &NoPredictionReason) -> &'static str {
    match reason {
        NoPredictionReason::InsufficientData { .. } => "insufficient_data",
        NoPredictionReason::NoThreshold => "no_threshold",
        NoPredictionReason::NoTrendDetected { .. } => "no_trend_detected",
        NoPredictionReason::HorizonExceeded { .. } => "horizon_exceeded",
    }
}

/// What a loan removal touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedLoan {
    /// Removed loan.
    pub loan_id: LoanId,
    /// Covenants removed with it.
    pub covenants_removed: usize,
    /// Alerts whose references were cleared.
    pub alerts_detached: usize,
}

// =============================================================================
// ENGINE
// =============================================================================

/// The covenant compliance engine.
pub struct CovenantEngine {
    /// Engine configuration
    config: EngineConfig,

    /// Storage backends
    storage: StorageProvider,

    /// Configured calculators
    ctx: CalcContext,

    /// Alert state machine over the alert store
    generator: Arc<AlertGenerator>,

    /// Latest measurement each covenant was successfully evaluated against
    evaluated: DashMap<CovenantId, MeasurementId>,

    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
}

impl CovenantEngine {
    /// Create a new engine.
    pub fn new(config: EngineConfig, storage: StorageProvider) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let ctx = CalcContext::from_config(&config);
        let generator = Arc::new(AlertGenerator::new(
            Arc::clone(&storage.alerts),
            config.alerts.clone(),
        ));
        Self {
            config,
            storage,
            ctx,
            generator,
            evaluated: DashMap::new(),
            shutdown_tx,
        }
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the storage provider.
    pub fn storage(&self) -> &StorageProvider {
        &self.storage
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Start the refresh scheduler, if an interval is configured.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.config.refresh_interval()?;
        Some(scheduler::spawn_refresh_loop(
            Arc::clone(self),
            period,
            self.shutdown_tx.subscribe(),
        ))
    }

    /// Signal background tasks to stop.
    pub async fn shutdown(&self) -> EngineResult<()> {
        info!("Shutting down covenant engine");
        let _ = self.shutdown_tx.send(());
        Ok(())
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// Loads everything into a snapshot, restricted to `user` when given.
    pub async fn snapshot(&self, user: Option<&UserId>) -> EngineResult<PortfolioSnapshot> {
        let (loans, covenants, measurements, alerts) = tokio::try_join!(
            self.storage.loans.list(),
            self.storage.covenants.list(),
            self.storage.measurements.list(),
            self.storage.alerts.list(),
        )?;
        let snapshot = PortfolioSnapshot::new(loans, covenants, measurements, alerts);
        Ok(match user {
            Some(_) => snapshot.scoped(user),
            None => snapshot,
        })
    }

    // =========================================================================
    // PORTFOLIO ANALYTICS
    // =========================================================================

    /// Dashboard summary counts.
    pub async fn portfolio_summary(&self, user: Option<&UserId>) -> EngineResult<PortfolioSummary> {
        let snapshot = self.snapshot(user).await?;
        Ok(analytics::summarize(&snapshot, &self.ctx.analytics))
    }

    /// One heatmap entry per active loan, worst first.
    pub async fn risk_heatmap(&self, user: Option<&UserId>) -> EngineResult<Vec<RiskHeatmapItem>> {
        let snapshot = self.snapshot(user).await?;
        Ok(analytics::risk_heatmap(&snapshot, &self.ctx.analytics))
    }

    /// Open alerts ordered by severity, then soonest breach.
    pub async fn critical_alerts(
        &self,
        user: Option<&UserId>,
        limit: usize,
    ) -> EngineResult<Vec<Alert>> {
        let snapshot = self.snapshot(user).await?;
        Ok(analytics::critical_alerts(snapshot.alerts(), limit))
    }

    /// Outstanding principal now versus the end of the previous period.
    pub async fn portfolio_value(
        &self,
        user: Option<&UserId>,
        as_of: Date,
    ) -> EngineResult<PortfolioValue> {
        let snapshot = self.snapshot(user).await?;
        Ok(analytics::portfolio_value(
            &snapshot,
            as_of,
            self.config.trends.months,
        )?)
    }

    /// Month-end outstanding principal for the current and previous periods.
    pub async fn portfolio_trends(
        &self,
        user: Option<&UserId>,
        as_of: Date,
    ) -> EngineResult<PortfolioTrends> {
        let snapshot = self.snapshot(user).await?;
        Ok(analytics::portfolio_trends(
            &snapshot,
            as_of,
            self.config.trends.months,
        )?)
    }

    /// Status count changes, month over month.
    pub async fn covenant_trends(
        &self,
        user: Option<&UserId>,
        as_of: Date,
    ) -> EngineResult<CovenantTrends> {
        let snapshot = self.snapshot(user).await?;
        let compare_to = as_of.add_months(-1)?;
        Ok(analytics::covenant_trends(&snapshot, as_of, compare_to))
    }

    /// Substring and fuzzy search.
    pub async fn search(
        &self,
        user: Option<&UserId>,
        query: &str,
        limit: usize,
    ) -> EngineResult<SearchResults> {
        let snapshot = self.snapshot(user).await?;
        Ok(search::search(&snapshot, query, limit))
    }

    // =========================================================================
    // LOANS
    // =========================================================================

    /// Loans with derived status, newest first.
    pub async fn loans(&self, user: Option<&UserId>) -> EngineResult<Vec<LoanView>> {
        let snapshot = self.snapshot(user).await?;
        Ok(loan_views(&snapshot))
    }

    /// Most recently created loans.
    pub async fn recent_loans(
        &self,
        user: Option<&UserId>,
        limit: usize,
    ) -> EngineResult<Vec<LoanView>> {
        let mut views = self.loans(user).await?;
        views.truncate(limit);
        Ok(views)
    }

    /// One loan view.
    pub async fn loan(&self, id: &LoanId) -> EngineResult<LoanView> {
        let snapshot = self.snapshot(None).await?;
        let loan = snapshot
            .loan(id)
            .ok_or_else(|| EngineError::not_found("loan", id))?;
        Ok(LoanView::build(&snapshot, loan))
    }

    /// Creates a loan with its covenants.
    pub async fn create_loan(&self, input: NewLoan) -> EngineResult<LoanView> {
        let (loan, covenants) = input.into_parts(Utc::now())?;
        if self.storage.loans.get(&loan.id).await?.is_some() {
            return Err(EngineError::AlreadyExists(format!("loan {}", loan.id)));
        }
        for covenant in &covenants {
            if self.storage.covenants.get(&covenant.id).await?.is_some() {
                return Err(EngineError::AlreadyExists(format!("covenant {}", covenant.id)));
            }
        }
        let id = loan.id.clone();
        self.register_loan(loan, covenants).await?;
        info!(loan_id = %id, "loan created");
        self.loan(&id).await
    }

    /// Stores an already validated loan and its covenants, replacing any
    /// previous versions.
    pub async fn register_loan(
        &self,
        loan: LoanAgreement,
        covenants: Vec<Covenant>,
    ) -> EngineResult<()> {
        if let Some(stray) = covenants.iter().find(|c| c.loan_id != loan.id) {
            return Err(EngineError::invalid_input(format!(
                "covenant {} belongs to loan {}, not {}",
                stray.id, stray.loan_id, loan.id
            )));
        }
        self.storage.loans.save(&loan).await?;
        for covenant in &covenants {
            self.storage.covenants.save(covenant).await?;
        }
        debug!(loan_id = %loan.id, covenants = covenants.len(), "loan registered");
        Ok(())
    }

    /// Removes a loan and its covenants.
    ///
    /// Measurements are retained. Alerts keep their rows but lose the
    /// references to the removed entities.
    pub async fn remove_loan(&self, id: &LoanId) -> EngineResult<RemovedLoan> {
        if self.storage.loans.get(id).await?.is_none() {
            return Err(EngineError::not_found("loan", id));
        }
        let covenant_ids = self.storage.covenants.delete_for_loan(id).await?;
        let alerts_detached = self.storage.alerts.detach(id, &covenant_ids).await?;
        self.storage.loans.delete(id).await?;
        for covenant_id in &covenant_ids {
            self.evaluated.remove(covenant_id);
        }
        info!(loan_id = %id, covenants = covenant_ids.len(), alerts_detached, "loan removed");
        Ok(RemovedLoan {
            loan_id: id.clone(),
            covenants_removed: covenant_ids.len(),
            alerts_detached,
        })
    }

    // =========================================================================
    // COVENANTS
    // =========================================================================

    /// Covenants of a loan with their latest status.
    pub async fn covenants_for_loan(&self, loan_id: &LoanId) -> EngineResult<Vec<CovenantView>> {
        let snapshot = self.snapshot(None).await?;
        if snapshot.loan(loan_id).is_none() {
            return Err(EngineError::not_found("loan", loan_id));
        }
        Ok(covenant_views_for_loan(&snapshot, loan_id))
    }

    /// One covenant with its latest status.
    pub async fn covenant(&self, id: &CovenantId) -> EngineResult<CovenantView> {
        let snapshot = self.snapshot(None).await?;
        let covenant = snapshot
            .covenant(id)
            .ok_or_else(|| EngineError::not_found("covenant", id))?;
        Ok(CovenantView::build(&snapshot, covenant).with_loan_title(&snapshot))
    }

    async fn require_covenant(&self, id: &CovenantId) -> EngineResult<Covenant> {
        self.storage
            .covenants
            .get(id)
            .await?
            .ok_or_else(|| EngineError::not_found("covenant", id))
    }

    /// Measurement history, newest first.
    pub async fn measurements(&self, id: &CovenantId) -> EngineResult<Vec<CovenantMeasurement>> {
        self.require_covenant(id).await?;
        let mut history = self.storage.measurements.history(id).await?;
        history.reverse();
        Ok(history)
    }

    /// Monthly series of a covenant's measured value, current period against
    /// the one before.
    pub async fn covenant_trend(&self, id: &CovenantId, as_of: Date) -> EngineResult<TrendSeries> {
        self.require_covenant(id).await?;
        let history = self.storage.measurements.history(id).await?;
        let observations: Vec<Observation> = history.iter().map(Observation::from).collect();

        let current = Period::trailing_months(as_of, self.config.trends.months)?;
        let previous = current.preceding()?;
        let aggregation = self
            .ctx
            .aggregator
            .aggregate(&observations, &current, &previous);
        for gap in &aggregation.gaps {
            warn!(covenant_id = %id, from = %gap.from, to = %gap.to, days = gap.days, "measurement gap, carrying values forward");
        }
        Ok(aggregation.series)
    }

    /// Breach prediction for one covenant as of `as_of`.
    pub async fn prediction(&self, id: &CovenantId, as_of: Date) -> EngineResult<PredictionView> {
        let covenant = self.require_covenant(id).await?;
        let history = self.storage.measurements.history(id).await?;
        let observations: Vec<Observation> = history
            .iter()
            .filter(|m| m.measurement_date <= as_of)
            .map(Observation::from)
            .collect();

        let outcome = self.ctx.predictor.predict_as_of(
            &observations,
            covenant.threshold_value,
            covenant.threshold_operator,
            as_of,
        );
        let reason = outcome.reason();
        Ok(PredictionView {
            covenant_id: covenant.id,
            prediction: outcome.prediction().copied(),
            reason: reason.map(|r| reason_code(r).to_string()),
            trajectory: outcome.trajectory(),
            message: reason.map(|r| covenantiq_analytics::AnalyticsError::from(*r).to_string()),
        })
    }

    // =========================================================================
    // MEASUREMENTS
    // =========================================================================

    /// Records a measurement and re-evaluates the covenant's alerts as of
    /// today.
    pub async fn record_measurement(
        &self,
        id: &CovenantId,
        input: NewMeasurement,
    ) -> EngineResult<CovenantMeasurement> {
        let as_of = Date::today().max(input.measurement_date);
        self.record_measurement_as_of(id, input, as_of).await
    }

    /// Records a measurement and re-evaluates alerts as of `as_of`.
    ///
    /// An alert failure is logged; the measurement stays recorded.
    pub async fn record_measurement_as_of(
        &self,
        id: &CovenantId,
        input: NewMeasurement,
        as_of: Date,
    ) -> EngineResult<CovenantMeasurement> {
        let measurement = self.import_measurement(id, input).await?;
        match self.recompute_covenant(id, as_of).await {
            Ok(report) if !report.is_complete() => {
                warn!(covenant_id = %id, failed = ?report.failed_ids(), "alert refresh incomplete");
            }
            Ok(_) => {}
            Err(e) => warn!(covenant_id = %id, error = %e, "alert refresh failed"),
        }
        Ok(measurement)
    }

    /// Records a measurement without touching alerts.
    ///
    /// The covenant's current threshold is snapshotted onto the row and the
    /// status derived from it.
    pub async fn import_measurement(
        &self,
        id: &CovenantId,
        input: NewMeasurement,
    ) -> EngineResult<CovenantMeasurement> {
        if !input.actual_value.is_finite() {
            return Err(EngineError::invalid_input("actual_value must be finite"));
        }
        let covenant = self.require_covenant(id).await?;
        let evaluation = self.ctx.evaluator.evaluate_covenant(&covenant, input.actual_value);

        let measurement = CovenantMeasurement {
            id: MeasurementId::generate(),
            covenant_id: covenant.id.clone(),
            measurement_date: input.measurement_date,
            actual_value: input.actual_value,
            threshold_value: covenant.threshold_value,
            threshold_operator: covenant.threshold_operator,
            status: evaluation.status,
            distance_to_breach: evaluation.distance_to_breach,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            recorded_at: Utc::now(),
        };

        match self.storage.measurements.append(&measurement).await {
            Ok(()) => {}
            Err(TraitError::AlreadyExists(_)) => {
                return Err(EngineError::DuplicateMeasurement {
                    covenant_id: covenant.id,
                    date: measurement.measurement_date,
                })
            }
            Err(e) => return Err(e.into()),
        }
        debug!(covenant_id = %covenant.id, date = %measurement.measurement_date, status = %measurement.status, "measurement recorded");
        Ok(measurement)
    }

    // =========================================================================
    // ALERTS
    // =========================================================================

    /// Open alerts matching `filter`, newest first.
    pub async fn alerts(
        &self,
        user: Option<&UserId>,
        filter: &AlertFilter,
    ) -> EngineResult<Vec<Alert>> {
        let snapshot = self.snapshot(user).await?;
        Ok(analytics::open_alerts(snapshot.alerts(), filter))
    }

    /// Marks an alert read.
    pub async fn mark_alert_read(&self, id: &AlertId) -> EngineResult<Alert> {
        Ok(self.storage.alerts.mark_read(id).await?)
    }

    /// Resolves an alert. The only way an alert leaves the open state.
    pub async fn resolve_alert(&self, id: &AlertId) -> EngineResult<Alert> {
        let alert = self.storage.alerts.resolve(id, Utc::now()).await?;
        info!(alert_id = %id, "alert resolved");
        Ok(alert)
    }

    // =========================================================================
    // RECOMPUTE
    // =========================================================================

    /// Recomputes alerts as of today.
    pub async fn recompute(&self, mode: RecomputeMode) -> EngineResult<RecomputeReport> {
        self.recompute_as_of(mode, Date::today()).await
    }

    /// Recomputes alerts across the portfolio as of `as_of`.
    ///
    /// Failures are collected in the report. Only a failed fetch fails the call.
    pub async fn recompute_as_of(
        &self,
        mode: RecomputeMode,
        as_of: Date,
    ) -> EngineResult<RecomputeReport> {
        let started = Instant::now();
        let batches = self.fetch_batches(mode).await?;
        let report = self.run(batches, as_of).await;
        info!(
            ?mode,
            loans = report.loans_processed,
            covenants = report.covenants_evaluated,
            opened = report.alerts_opened,
            updated = report.alerts_updated,
            refreshed = report.alerts_refreshed,
            reopened = report.alerts_reopened,
            failed = report.failed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recompute finished"
        );
        Ok(report)
    }

    /// Recomputes one covenant's alerts as of `as_of`.
    pub async fn recompute_covenant(
        &self,
        id: &CovenantId,
        as_of: Date,
    ) -> EngineResult<RecomputeReport> {
        let covenant = self.require_covenant(id).await?;
        let loan = self
            .storage
            .loans
            .get(&covenant.loan_id)
            .await?
            .ok_or_else(|| EngineError::not_found("loan", &covenant.loan_id))?;
        if !loan.is_active() || !covenant.is_active {
            return Ok(RecomputeReport::default());
        }
        let history = self.storage.measurements.history(id).await?;
        let batch = LoanBatch {
            loan,
            covenants: vec![(covenant, history)],
        };
        Ok(self.run(vec![batch], as_of).await)
    }

    async fn run(&self, batches: Vec<LoanBatch>, as_of: Date) -> RecomputeReport {
        let (report, evaluated) = run_batches(
            batches,
            self.ctx.predictor,
            Arc::clone(&self.generator),
            as_of,
            Utc::now(),
        )
        .await;
        for (covenant_id, measurement_id) in evaluated {
            self.evaluated.insert(covenant_id, measurement_id);
        }
        report
    }

    /// Fetch phase: active loans with the covenants to evaluate.
    async fn fetch_batches(&self, mode: RecomputeMode) -> EngineResult<Vec<LoanBatch>> {
        let (loans, covenants, measurements) = tokio::try_join!(
            self.storage.loans.list(),
            self.storage.covenants.list(),
            self.storage.measurements.list(),
        )?;

        let mut history: HashMap<CovenantId, Vec<CovenantMeasurement>> = HashMap::new();
        for m in measurements {
            history.entry(m.covenant_id.clone()).or_default().push(m);
        }
        for rows in history.values_mut() {
            rows.sort_by_key(|m| m.measurement_date);
        }

        let open_alerts: HashSet<CovenantId> = if mode == RecomputeMode::Due {
            self.storage
                .alerts
                .list()
                .await?
                .into_iter()
                .filter(Alert::is_open)
                .filter_map(|a| a.covenant_id)
                .collect()
        } else {
            HashSet::new()
        };

        let mut by_loan: HashMap<LoanId, Vec<Covenant>> = HashMap::new();
        for covenant in covenants.into_iter().filter(|c| c.is_active) {
            by_loan.entry(covenant.loan_id.clone()).or_default().push(covenant);
        }

        let mut batches = Vec::new();
        for loan in loans.into_iter().filter(LoanAgreement::is_active) {
            let selected: Vec<(Covenant, Vec<CovenantMeasurement>)> = by_loan
                .remove(&loan.id)
                .unwrap_or_default()
                .into_iter()
                .map(|c| {
                    let rows = history.remove(&c.id).unwrap_or_default();
                    (c, rows)
                })
                .filter(|(c, rows)| match mode {
                    RecomputeMode::All => true,
                    RecomputeMode::Changed => self.has_changed(&c.id, rows),
                    RecomputeMode::Due => open_alerts.contains(&c.id) || self.has_changed(&c.id, rows),
                })
                .collect();
            if mode != RecomputeMode::All && selected.is_empty() {
                continue;
            }
            batches.push(LoanBatch {
                loan,
                covenants: selected,
            });
        }
        debug!(?mode, loans = batches.len(), "recompute fetch phase complete");
        Ok(batches)
    }

    fn has_changed(&self, id: &CovenantId, rows: &[CovenantMeasurement]) -> bool {
        let Some(latest) = rows.last() else {
            return false;
        };
        self.evaluated
            .get(id)
            .map_or(true, |seen| *seen != latest.id)
    }
}
