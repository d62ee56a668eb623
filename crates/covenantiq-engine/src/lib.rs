//! # CovenantIQ Engine
//!
//! The covenant compliance engine.
//!
//! This crate provides:
//! - [`AlertGenerator`]: Per-key alert state machine over the alert store
//! - [`CovenantEngine`]: Facade over storage, analytics and alerting
//! - [`CovenantEngineBuilder`]: Dependency-injected construction
//! - Portfolio recompute with per-loan isolation ([`RecomputeReport`])
//! - An interval refresh scheduler
//!
//! ## Architecture
//!
//! ```text
//! Stores ─> fetch phase ─> per-loan tasks ─┬─> BreachPredictor ─┐
//!                                          │                    ├─> AlertGenerator ─> AlertStore
//!                                          └─> latest status ───┘
//!
//! Stores ─> PortfolioSnapshot ─> summary / heatmap / trends / search
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Arc::new(
//!     CovenantEngineBuilder::new()
//!         .with_storage(storage_provider)
//!         .with_config(EngineConfig::default())
//!         .build()?,
//! );
//!
//! engine.start();
//! let report = engine.recompute(RecomputeMode::All).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alert_generator;
pub mod builder;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod recompute;

mod context;
mod scheduler;

// Re-exports
pub use alert_generator::{severity_for, AlertCandidate, AlertGenerator, AlertOutcome};
pub use builder::CovenantEngineBuilder;
pub use engine::{CovenantEngine, PredictionView, RemovedLoan};
pub use error::{EngineError, EngineResult};
pub use inputs::{NewCovenant, NewLoan, NewMeasurement};
pub use recompute::{EntityKind, FailedEntity, RecomputeMode, RecomputeReport};
