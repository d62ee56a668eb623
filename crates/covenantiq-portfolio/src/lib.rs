//! # CovenantIQ Portfolio
//!
//! Portfolio-level compliance analytics over loans, covenants, measurements
//! and alerts.
//!
//! ## Design Philosophy
//!
//! - **Pure functions**: every calculation takes a [`PortfolioSnapshot`] and
//!   explicit dates; nothing reads the clock or performs I/O
//! - **Deterministic output**: results are ordered so recomputing over an
//!   unchanged snapshot yields identical values
//! - **Config-driven parallelism**: optional rayon support with
//!   threshold-based switching
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use covenantiq_portfolio::prelude::*;
//!
//! let snapshot = PortfolioSnapshot::new(loans, covenants, measurements, alerts);
//! let config = AnalyticsConfig::default();
//! let summary = summarize(&snapshot, &config);
//! let heatmap = risk_heatmap(&snapshot, &config);
//! ```
//!
//! ## Module Overview
//!
//! - [`analytics`] - Summary, heatmap, value and trend series, alert ordering
//! - [`search`] - Substring and fuzzy search over loans and covenants
//! - [`types`] - Snapshot, views and configuration
//!
//! ## Feature Flags
//!
//! - `parallel`: Enable rayon-based parallel processing for large portfolios

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod analytics;
pub mod error;
pub mod search;
pub mod types;

pub use error::{PortfolioError, PortfolioResult};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::analytics::{
        covenant_trends, critical_alerts, open_alerts, portfolio_trends, portfolio_value,
        risk_heatmap, summarize, AlertFilter, CovenantTrends, PortfolioSummary, PortfolioTrends,
        PortfolioValue, RiskHeatmapItem,
    };
    pub use crate::error::{PortfolioError, PortfolioResult};
    pub use crate::search::{search, SearchResults};
    pub use crate::types::{
        covenant_views_for_loan, loan_views, AnalyticsConfig, CovenantView, LoanView,
        PortfolioSnapshot,
    };
}
