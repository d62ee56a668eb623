//! # CovenantIQ Server
//!
//! REST server for the CovenantIQ covenant compliance engine.
//!
//! ## Features
//!
//! - Portfolio analytics: summary, risk heatmap, value and status trends
//! - Loan and covenant views, measurement recording, breach predictions
//! - Alert listing and read/resolve workflow
//! - Configuration via TOML file, optional JSON/CSV seed data
//!
//! ## Usage
//!
//! ```ignore
//! use covenantiq_server::Server;
//!
//! let server = Server::new(config, engine);
//! server.start().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use covenantiq_core::{Covenant, LoanId};
use covenantiq_engine::{CovenantEngine, EngineError, NewMeasurement};
use covenantiq_ext_file::{load_measurements_csv, load_seed_json, SeedData};

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};

/// The CovenantIQ server.
pub struct Server {
    config: ServerConfig,
    engine: Arc<CovenantEngine>,
}

impl Server {
    /// Create a new server.
    pub fn new(config: ServerConfig, engine: Arc<CovenantEngine>) -> Self {
        Self { config, engine }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        routes::create_router(self.engine.clone())
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Start the server. Returns after Ctrl-C.
    pub async fn start(&self) -> Result<(), std::io::Error> {
        let addr = SocketAddr::new(
            self.config
                .host
                .parse()
                .unwrap_or_else(|_| [0, 0, 0, 0].into()),
            self.config.port,
        );

        info!("Starting CovenantIQ server on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Counts of what a seed load stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    /// Loans registered.
    pub loans: usize,
    /// Covenants registered.
    pub covenants: usize,
    /// Measurements imported.
    pub measurements: usize,
    /// Rows skipped as orphaned or duplicate.
    pub skipped: usize,
}

/// Loads the configured seed files into the engine.
///
/// Measurements are imported without touching alerts; the caller runs a
/// recompute afterwards.
pub async fn load_seed_data(
    engine: &CovenantEngine,
    config: &ServerConfig,
) -> Result<SeedStats, ServerError> {
    let mut data = match &config.data_file {
        Some(path) => load_seed_json(path).map_err(EngineError::from)?,
        None => SeedData::default(),
    };
    if let Some(path) = &config.measurements_file {
        data.extend_measurements(load_measurements_csv(path).map_err(EngineError::from)?);
    }
    seed_engine(engine, data).await
}

/// Stores seed data in the engine.
pub async fn seed_engine(engine: &CovenantEngine, data: SeedData) -> Result<SeedStats, ServerError> {
    let mut stats = SeedStats::default();

    let mut by_loan: HashMap<LoanId, Vec<Covenant>> = HashMap::new();
    for covenant in data.covenants {
        by_loan
            .entry(covenant.loan_id.clone())
            .or_default()
            .push(covenant);
    }

    for loan in data.loans {
        let covenants = by_loan.remove(&loan.id).unwrap_or_default();
        stats.loans += 1;
        stats.covenants += covenants.len();
        engine.register_loan(loan, covenants).await?;
    }
    for (loan_id, orphans) in by_loan {
        warn!(loan_id = %loan_id, count = orphans.len(), "skipping covenants of unknown loan");
        stats.skipped += orphans.len();
    }

    for row in data.measurements {
        let input = NewMeasurement {
            measurement_date: row.measurement_date,
            actual_value: row.actual_value,
            notes: row.notes,
        };
        match engine.import_measurement(&row.covenant_id, input).await {
            Ok(_) => stats.measurements += 1,
            Err(e @ (EngineError::DuplicateMeasurement { .. } | EngineError::NotFound(_))) => {
                warn!(covenant_id = %row.covenant_id, error = %e, "skipping measurement row");
                stats.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        loans = stats.loans,
        covenants = stats.covenants,
        measurements = stats.measurements,
        skipped = stats.skipped,
        "seed data loaded"
    );
    Ok(stats)
}
