//! Request handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use covenantiq_analytics::TrendSeries;
use covenantiq_core::{
    Alert, AlertId, AlertSeverity, CovenantId, CovenantMeasurement, Date, LoanId, UserId,
};
use covenantiq_engine::{
    CovenantEngine, NewLoan, NewMeasurement, PredictionView, RecomputeMode, RecomputeReport,
    RemovedLoan,
};
use covenantiq_portfolio::analytics::{
    AlertFilter, CovenantTrends, PortfolioSummary, PortfolioTrends, PortfolioValue,
    RiskHeatmapItem,
};
use covenantiq_portfolio::search::SearchResults;
use covenantiq_portfolio::types::{CovenantView, LoanView};

use crate::error::ApiError;

/// Application state.
pub struct AppState {
    /// The covenant engine
    pub engine: Arc<CovenantEngine>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

const DEFAULT_CRITICAL_LIMIT: usize = 5;
const DEFAULT_RECENT_LIMIT: usize = 10;
const DEFAULT_SEARCH_LIMIT: usize = 20;

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// Ownership scope and evaluation date.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    /// Restrict to loans owned by this user.
    pub user_id: Option<String>,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    pub as_of: Option<String>,
}

impl ScopeQuery {
    fn user(&self) -> Option<UserId> {
        self.user_id.as_deref().map(UserId::new)
    }

    fn as_of(&self) -> Result<Date, ApiError> {
        parse_as_of(self.as_of.as_deref())
    }
}

/// Ownership scope and result limit.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    /// Restrict to loans owned by this user.
    pub user_id: Option<String>,
    /// Maximum results.
    pub limit: Option<usize>,
}

/// Alert listing filters.
#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    /// Restrict to loans owned by this user.
    pub user_id: Option<String>,
    /// Only unread alerts.
    #[serde(default)]
    pub unread_only: bool,
    /// Only alerts of this severity.
    pub severity: Option<AlertSeverity>,
    /// Maximum results.
    pub limit: Option<usize>,
}

/// Search parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Query text.
    #[serde(default)]
    pub q: String,
    /// Restrict to loans owned by this user.
    pub user_id: Option<String>,
    /// Maximum hits per kind.
    pub limit: Option<usize>,
}

fn parse_as_of(value: Option<&str>) -> Result<Date, ApiError> {
    match value {
        Some(s) => Ok(Date::parse(s)?),
        None => Ok(Date::today()),
    }
}

// =============================================================================
// HEALTH
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

/// Health check handler.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// ANALYTICS
// =============================================================================

/// Dashboard counts.
pub async fn portfolio_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<PortfolioSummary> {
    Ok(Json(state.engine.portfolio_summary(query.user().as_ref()).await?))
}

/// Loans ordered worst status first.
pub async fn risk_heatmap(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Vec<RiskHeatmapItem>> {
    Ok(Json(state.engine.risk_heatmap(query.user().as_ref()).await?))
}

/// Open alerts, most severe first.
pub async fn critical_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<Alert>> {
    let user = query.user_id.as_deref().map(UserId::new);
    let limit = query.limit.unwrap_or(DEFAULT_CRITICAL_LIMIT);
    Ok(Json(state.engine.critical_alerts(user.as_ref(), limit).await?))
}

/// Outstanding principal now and at the end of the previous period.
pub async fn portfolio_value(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<PortfolioValue> {
    let as_of = query.as_of()?;
    Ok(Json(
        state
            .engine
            .portfolio_value(query.user().as_ref(), as_of)
            .await?,
    ))
}

/// Monthly outstanding principal, current period against previous.
pub async fn portfolio_trends(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<PortfolioTrends> {
    let as_of = query.as_of()?;
    Ok(Json(
        state
            .engine
            .portfolio_trends(query.user().as_ref(), as_of)
            .await?,
    ))
}

/// Month-over-month change in covenant status counts.
pub async fn covenant_trends(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<CovenantTrends> {
    let as_of = query.as_of()?;
    Ok(Json(
        state
            .engine
            .covenant_trends(query.user().as_ref(), as_of)
            .await?,
    ))
}

/// Most recently created loans.
pub async fn recent_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<LoanView>> {
    let user = query.user_id.as_deref().map(UserId::new);
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(state.engine.recent_loans(user.as_ref(), limit).await?))
}

/// Re-evaluates every active covenant and returns the report.
pub async fn recompute(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<RecomputeReport> {
    let as_of = query.as_of()?;
    let report = state
        .engine
        .recompute_as_of(RecomputeMode::All, as_of)
        .await?;
    Ok(Json(report))
}

// =============================================================================
// LOANS
// =============================================================================

/// All loans with derived status.
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Vec<LoanView>> {
    Ok(Json(state.engine.loans(query.user().as_ref()).await?))
}

/// One loan.
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<String>,
) -> ApiResult<LoanView> {
    Ok(Json(state.engine.loan(&LoanId::new(loan_id)).await?))
}

/// Create a loan with its covenants.
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewLoan>,
) -> Result<(StatusCode, Json<LoanView>), ApiError> {
    let view = state.engine.create_loan(request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Delete a loan and its covenants.
pub async fn delete_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<String>,
) -> ApiResult<RemovedLoan> {
    Ok(Json(state.engine.remove_loan(&LoanId::new(loan_id)).await?))
}

// =============================================================================
// COVENANTS
// =============================================================================

/// Covenants of a loan with their latest status.
pub async fn covenants_for_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<String>,
) -> ApiResult<Vec<CovenantView>> {
    Ok(Json(
        state
            .engine
            .covenants_for_loan(&LoanId::new(loan_id))
            .await?,
    ))
}

/// One covenant.
pub async fn get_covenant(
    State(state): State<Arc<AppState>>,
    Path(covenant_id): Path<String>,
) -> ApiResult<CovenantView> {
    Ok(Json(state.engine.covenant(&CovenantId::new(covenant_id)).await?))
}

/// Measurement history, newest first.
pub async fn list_measurements(
    State(state): State<Arc<AppState>>,
    Path(covenant_id): Path<String>,
) -> ApiResult<Vec<CovenantMeasurement>> {
    Ok(Json(
        state
            .engine
            .measurements(&CovenantId::new(covenant_id))
            .await?,
    ))
}

/// Record a measurement and refresh the covenant's alerts.
pub async fn record_measurement(
    State(state): State<Arc<AppState>>,
    Path(covenant_id): Path<String>,
    Json(request): Json<NewMeasurement>,
) -> Result<(StatusCode, Json<CovenantMeasurement>), ApiError> {
    let measurement = state
        .engine
        .record_measurement(&CovenantId::new(covenant_id), request)
        .await?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

/// Breach prediction, or the reason there is none.
pub async fn get_prediction(
    State(state): State<Arc<AppState>>,
    Path(covenant_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<PredictionView> {
    let as_of = query.as_of()?;
    Ok(Json(
        state
            .engine
            .prediction(&CovenantId::new(covenant_id), as_of)
            .await?,
    ))
}

/// Monthly series of the covenant's measured value.
pub async fn get_covenant_trend(
    State(state): State<Arc<AppState>>,
    Path(covenant_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<TrendSeries> {
    let as_of = query.as_of()?;
    Ok(Json(
        state
            .engine
            .covenant_trend(&CovenantId::new(covenant_id), as_of)
            .await?,
    ))
}

// =============================================================================
// ALERTS
// =============================================================================

/// Open alerts, newest first.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<Vec<Alert>> {
    let user = query.user_id.as_deref().map(UserId::new);
    let mut filter = AlertFilter {
        unread_only: query.unread_only,
        severity: query.severity,
        ..AlertFilter::default()
    };
    if let Some(limit) = query.limit {
        filter.limit = limit;
    }
    Ok(Json(state.engine.alerts(user.as_ref(), &filter).await?))
}

/// Mark an alert read.
pub async fn mark_alert_read(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
) -> ApiResult<Alert> {
    Ok(Json(state.engine.mark_alert_read(&AlertId::new(alert_id)).await?))
}

/// Resolve an alert.
pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
) -> ApiResult<Alert> {
    Ok(Json(state.engine.resolve_alert(&AlertId::new(alert_id)).await?))
}

// =============================================================================
// SEARCH
// =============================================================================

/// Search loans and covenants.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<SearchResults> {
    let user = query.user_id.as_deref().map(UserId::new);
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    Ok(Json(
        state
            .engine
            .search(user.as_ref(), &query.q, limit)
            .await?,
    ))
}
