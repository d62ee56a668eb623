//! # CovenantIQ Traits
//!
//! Trait definitions for the CovenantIQ engine.
//!
//! This crate contains ONLY trait definitions and plain configuration types.
//! All implementations are in separate extension crates.
//!
//! ## Module Structure
//!
//! - [`storage`]: Traits for persistence (loans, covenants, measurements, alerts)
//! - [`config`]: Engine configuration sections
//!
//! ## Dependency Injection
//!
//! The engine uses these traits via dependency injection:
//!
//! ```ignore
//! EngineBuilder::new()
//!     .with_loans(impl LoanStore)
//!     .with_covenants(impl CovenantStore)
//!     .with_measurements(impl MeasurementStore)
//!     .with_alerts(impl AlertStore)
//!     .with_config(EngineConfig::default())
//!     .build()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::TraitError;
pub use storage::{AlertStore, CovenantStore, LoanStore, MeasurementStore, StorageProvider};
