//! # CovenantIQ Ext File
//!
//! In-memory storage and file-based seed data for the CovenantIQ engine.
//!
//! This crate provides default implementations for testing, demos and
//! single-process deployments:
//! - DashMap-backed stores for loans, covenants, measurements and alerts
//! - JSON seed loader for loans with nested covenants
//! - CSV loader for measurement history
//!
//! For durable persistence, implement the storage traits over a database.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod memory;
mod seed;

pub use memory::*;
pub use seed::*;

use std::sync::Arc;

use covenantiq_traits::storage::StorageProvider;

/// Create a storage provider backed by empty in-memory stores.
pub fn create_memory_storage() -> StorageProvider {
    StorageProvider {
        loans: Arc::new(InMemoryLoanStore::new()),
        covenants: Arc::new(InMemoryCovenantStore::new()),
        measurements: Arc::new(InMemoryMeasurementStore::new()),
        alerts: Arc::new(InMemoryAlertStore::new()),
    }
}
