//! Storage traits for persistence.
//!
//! These traits define interfaces for storage backends:
//! - [`LoanStore`]: Loan agreement storage
//! - [`CovenantStore`]: Covenant definitions
//! - [`MeasurementStore`]: Append-only measurement history
//! - [`AlertStore`]: Alerts with per-key compare-and-swap
//!
//! Storage implementations are EXTENSIONS (e.g., in-memory, file-backed, SQL).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use covenantiq_core::{
    Alert, AlertId, AlertKey, Covenant, CovenantId, CovenantMeasurement, LoanAgreement, LoanId,
};

use crate::error::TraitError;

// =============================================================================
// LOANS AND COVENANTS
// =============================================================================

/// Storage for loan agreements.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Get a loan by ID.
    async fn get(&self, id: &LoanId) -> Result<Option<LoanAgreement>, TraitError>;

    /// List all loans.
    async fn list(&self) -> Result<Vec<LoanAgreement>, TraitError>;

    /// Insert or replace a loan.
    async fn save(&self, loan: &LoanAgreement) -> Result<(), TraitError>;

    /// Delete a loan. Returns whether it existed.
    async fn delete(&self, id: &LoanId) -> Result<bool, TraitError>;
}

/// Storage for covenant definitions.
#[async_trait]
pub trait CovenantStore: Send + Sync {
    /// Get a covenant by ID.
    async fn get(&self, id: &CovenantId) -> Result<Option<Covenant>, TraitError>;

    /// List all covenants.
    async fn list(&self) -> Result<Vec<Covenant>, TraitError>;

    /// List covenants belonging to a loan.
    async fn list_for_loan(&self, loan_id: &LoanId) -> Result<Vec<Covenant>, TraitError>;

    /// Insert or replace a covenant.
    async fn save(&self, covenant: &Covenant) -> Result<(), TraitError>;

    /// Delete every covenant of a loan, returning the removed IDs.
    async fn delete_for_loan(&self, loan_id: &LoanId) -> Result<Vec<CovenantId>, TraitError>;
}

// =============================================================================
// MEASUREMENTS
// =============================================================================

/// Append-only measurement history.
///
/// Implementations must reject a second row for the same
/// `(covenant_id, measurement_date)` with [`TraitError::AlreadyExists`].
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// History of one covenant, oldest first.
    async fn history(&self, covenant_id: &CovenantId)
        -> Result<Vec<CovenantMeasurement>, TraitError>;

    /// Every stored measurement.
    async fn list(&self) -> Result<Vec<CovenantMeasurement>, TraitError>;

    /// Most recent measurement of a covenant.
    async fn latest(
        &self,
        covenant_id: &CovenantId,
    ) -> Result<Option<CovenantMeasurement>, TraitError>;

    /// Append a measurement.
    async fn append(&self, measurement: &CovenantMeasurement) -> Result<(), TraitError>;
}

// =============================================================================
// ALERTS
// =============================================================================

/// Alert storage keyed by `(covenant_id, alert_type)`.
///
/// A key maps to at most one alert row for its whole life: re-opening a
/// resolved alert rewrites that row. Writes for a key are serialized with
/// compare-and-swap on [`Alert::version`].
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Get an alert by ID.
    async fn get(&self, id: &AlertId) -> Result<Option<Alert>, TraitError>;

    /// The alert row for a key, open or resolved.
    async fn find_by_key(&self, key: &AlertKey) -> Result<Option<Alert>, TraitError>;

    /// List all alerts.
    async fn list(&self) -> Result<Vec<Alert>, TraitError>;

    /// Write `alert` if the stored row for its key has `expected_version`.
    ///
    /// `None` means no row may exist yet. Fails with
    /// [`TraitError::Conflict`] when the precondition does not hold.
    async fn upsert_if_version(
        &self,
        alert: &Alert,
        expected_version: Option<u64>,
    ) -> Result<(), TraitError>;

    /// Mark an alert read, returning the updated row.
    async fn mark_read(&self, id: &AlertId) -> Result<Alert, TraitError>;

    /// Resolve an alert, returning the updated row.
    async fn resolve(&self, id: &AlertId, at: DateTime<Utc>) -> Result<Alert, TraitError>;

    /// Clear references to a removed loan and its covenants.
    ///
    /// Returns the number of alerts touched.
    async fn detach(&self, loan_id: &LoanId, covenant_ids: &[CovenantId])
        -> Result<usize, TraitError>;
}

// =============================================================================
// STORAGE PROVIDER
// =============================================================================

use std::sync::Arc;

/// Combined storage provider (concrete struct holding all stores).
#[derive(Clone)]
pub struct StorageProvider {
    /// Loan store
    pub loans: Arc<dyn LoanStore>,
    /// Covenant store
    pub covenants: Arc<dyn CovenantStore>,
    /// Measurement store
    pub measurements: Arc<dyn MeasurementStore>,
    /// Alert store
    pub alerts: Arc<dyn AlertStore>,
}
