//! Route definitions.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use covenantiq_engine::CovenantEngine;

use crate::handlers::{self, AppState};

/// Create the API router.
///
/// # Arguments
/// * `engine` - The covenant engine
pub fn create_router(engine: Arc<CovenantEngine>) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Portfolio analytics
        .route("/api/analytics/portfolio-summary", get(handlers::portfolio_summary))
        .route("/api/analytics/risk-heatmap", get(handlers::risk_heatmap))
        .route("/api/analytics/critical-alerts", get(handlers::critical_alerts))
        .route("/api/analytics/portfolio-value", get(handlers::portfolio_value))
        .route("/api/analytics/portfolio-trends", get(handlers::portfolio_trends))
        .route("/api/analytics/covenant-trends", get(handlers::covenant_trends))
        .route("/api/analytics/recent-loans", get(handlers::recent_loans))
        .route("/api/analytics/recompute", post(handlers::recompute))
        // Loans
        .route("/api/loans", get(handlers::list_loans).post(handlers::create_loan))
        .route("/api/loans/:loan_id", get(handlers::get_loan).delete(handlers::delete_loan))
        // Covenants
        .route("/api/covenants/loan/:loan_id", get(handlers::covenants_for_loan))
        .route("/api/covenants/:covenant_id", get(handlers::get_covenant))
        .route("/api/covenants/:covenant_id/measurements", get(handlers::list_measurements).post(handlers::record_measurement))
        .route("/api/covenants/:covenant_id/prediction", get(handlers::get_prediction))
        .route("/api/covenants/:covenant_id/trend", get(handlers::get_covenant_trend))
        // Alerts
        .route("/api/alerts", get(handlers::list_alerts))
        .route("/api/alerts/:alert_id/read", put(handlers::mark_alert_read))
        .route("/api/alerts/:alert_id/resolve", put(handlers::resolve_alert))
        // Search
        .route("/api/search", get(handlers::search))
        // State
        .with_state(state)
}
