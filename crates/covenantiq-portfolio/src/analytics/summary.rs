//! Portfolio summary counts.

use covenantiq_core::{ComplianceStatus, Covenant};
use serde::{Deserialize, Serialize};

use super::covenant_trends::StatusCounts;
use super::parallel::maybe_parallel_fold;
use crate::types::{AnalyticsConfig, PortfolioSnapshot};

/// Headline counts for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Loans in scope.
    pub total_loans: usize,
    /// Loans with an active lifecycle.
    pub active_loans: usize,
    /// Active covenants.
    pub total_covenants: usize,
    /// Active covenants whose latest measurement is compliant.
    pub compliant_covenants: usize,
    /// Active covenants whose latest measurement is in the warning band.
    pub warning_covenants: usize,
    /// Active covenants whose latest measurement breaches.
    pub breach_covenants: usize,
    /// Active covenants with no threshold or no measurement.
    pub unknown_covenants: usize,
    /// Open alerts not yet read.
    pub unread_alerts: usize,
    /// Open alerts of high severity.
    pub critical_alerts: usize,
}

/// Computes the summary for a snapshot.
#[must_use]
pub fn summarize(snapshot: &PortfolioSnapshot, config: &AnalyticsConfig) -> PortfolioSummary {
    let loans = snapshot.loans();
    let active: Vec<&Covenant> = snapshot.covenants().iter().filter(|c| c.is_active).collect();

    let counts = maybe_parallel_fold(
        &active,
        config,
        StatusCounts::default(),
        |mut acc, c| {
            acc.record(snapshot.covenant_status(c));
            acc
        },
        StatusCounts::merge,
    );

    let alerts = snapshot.alerts();
    let summary = PortfolioSummary {
        total_loans: loans.len(),
        active_loans: loans.iter().filter(|l| l.is_active()).count(),
        total_covenants: active.len(),
        compliant_covenants: counts.get(ComplianceStatus::Compliant),
        warning_covenants: counts.get(ComplianceStatus::Warning),
        breach_covenants: counts.get(ComplianceStatus::Breach),
        unknown_covenants: counts.get(ComplianceStatus::Unknown),
        unread_alerts: alerts.iter().filter(|a| a.is_unread()).count(),
        critical_alerts: alerts.iter().filter(|a| a.is_critical()).count(),
    };
    log::debug!("portfolio summary: {summary:?}");
    summary
}
