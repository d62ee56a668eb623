//! Risk heatmap: one entry per active loan.

use covenantiq_core::{ComplianceStatus, LoanId};
use serde::{Deserialize, Serialize};

use super::parallel::maybe_parallel_map;
use crate::types::{AnalyticsConfig, PortfolioSnapshot};

/// Heatmap cell for one loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskHeatmapItem {
    /// Loan identifier.
    pub loan_id: LoanId,
    /// Loan title.
    pub loan_title: String,
    /// Borrower name.
    pub borrower_name: Option<String>,
    /// Worst status among active covenants.
    pub status: ComplianceStatus,
    /// Active covenants.
    pub covenant_count: usize,
    /// Active covenants currently in breach.
    pub critical_count: usize,
}

/// Builds the heatmap, worst loans first, then by title and id.
#[must_use]
pub fn risk_heatmap(snapshot: &PortfolioSnapshot, config: &AnalyticsConfig) -> Vec<RiskHeatmapItem> {
    let active: Vec<_> = snapshot.loans().iter().filter(|l| l.is_active()).collect();

    let mut items = maybe_parallel_map(&active, config, |loan| {
        let mut status = ComplianceStatus::Unknown;
        let mut covenant_count = 0;
        let mut critical_count = 0;
        for covenant in snapshot.active_covenants_for(&loan.id) {
            let s = snapshot.covenant_status(covenant);
            status = status.worst(s);
            covenant_count += 1;
            if s == ComplianceStatus::Breach {
                critical_count += 1;
            }
        }
        RiskHeatmapItem {
            loan_id: loan.id.clone(),
            loan_title: loan.title.clone(),
            borrower_name: Some(loan.borrower_name.clone()).filter(|b| !b.is_empty()),
            status,
            covenant_count,
            critical_count,
        }
    });

    items.sort_by(|a, b| {
        b.status
            .precedence()
            .cmp(&a.status.precedence())
            .then_with(|| a.loan_title.cmp(&b.loan_title))
            .then_with(|| a.loan_id.cmp(&b.loan_id))
    });
    items
}
