//! Core types for portfolio analytics.

mod config;
mod snapshot;
mod views;

pub use config::AnalyticsConfig;
pub use snapshot::PortfolioSnapshot;
pub use views::{covenant_views_for_loan, loan_views, CovenantView, LoanView};
