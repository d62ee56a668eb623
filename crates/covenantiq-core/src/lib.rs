//! # CovenantIQ Core
//!
//! Core domain types for the CovenantIQ covenant compliance engine.
//!
//! This crate provides the vocabulary shared by every other crate:
//!
//! - **Identifiers**: `LoanId`, `CovenantId`, `MeasurementId`, `AlertId`, `UserId`
//! - **Dates**: a calendar `Date` newtype with month arithmetic
//! - **Closed enums**: `ComplianceStatus`, `ThresholdOperator`, `AlertSeverity`,
//!   `AlertType`, `Trajectory`, `LoanLifecycle`
//! - **Entities**: `LoanAgreement`, `Covenant`, `CovenantMeasurement`, `Alert`
//!
//! ## Example
//!
//! ```rust
//! use covenantiq_core::prelude::*;
//!
//! let op: ThresholdOperator = "<=".parse().unwrap();
//! assert!(op.is_satisfied(2.5, 3.0, 0.0));
//! assert_eq!(ComplianceStatus::Breach.worst(ComplianceStatus::Warning), ComplianceStatus::Breach);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::types::{
        Alert, AlertId, AlertKey, AlertSeverity, AlertType, ComplianceStatus, Covenant,
        CovenantId, CovenantMeasurement, Date, LoanAgreement, LoanId, LoanLifecycle,
        MeasurementId, ThresholdOperator, Trajectory, UserId,
    };
}

pub use error::{CoreError, CoreResult};
pub use types::*;
