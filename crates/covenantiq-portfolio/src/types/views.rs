//! Read models returned to the presentation layer.

use covenantiq_core::{ComplianceStatus, Covenant, Date, LoanAgreement};
use serde::{Deserialize, Serialize};

use super::PortfolioSnapshot;

/// A covenant with its latest measured status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovenantView {
    /// The covenant definition.
    #[serde(flatten)]
    pub covenant: Covenant,
    /// Status of the latest measurement.
    pub latest_status: ComplianceStatus,
    /// Value of the latest measurement.
    pub latest_value: Option<f64>,
    /// Date of the latest measurement.
    pub latest_measurement_date: Option<Date>,
    /// Owning loan title, filled for search hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_title: Option<String>,
}

impl CovenantView {
    /// Builds the view from a snapshot.
    #[must_use]
    pub fn build(snapshot: &PortfolioSnapshot, covenant: &Covenant) -> Self {
        let latest = snapshot.latest_measurement(&covenant.id);
        Self {
            covenant: covenant.clone(),
            latest_status: snapshot.covenant_status(covenant),
            latest_value: latest.map(|m| m.actual_value),
            latest_measurement_date: latest.map(|m| m.measurement_date),
            loan_title: None,
        }
    }

    /// Attaches the owning loan's title.
    #[must_use]
    pub fn with_loan_title(mut self, snapshot: &PortfolioSnapshot) -> Self {
        self.loan_title = snapshot
            .loan(&self.covenant.loan_id)
            .map(|l| l.title.clone());
        self
    }
}

/// A loan with its derived compliance status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    /// The loan agreement.
    #[serde(flatten)]
    pub loan: LoanAgreement,
    /// Worst status among active covenants.
    pub status: ComplianceStatus,
    /// Number of active covenants.
    pub covenant_count: usize,
}

impl LoanView {
    /// Builds the view from a snapshot.
    #[must_use]
    pub fn build(snapshot: &PortfolioSnapshot, loan: &LoanAgreement) -> Self {
        Self {
            loan: loan.clone(),
            status: snapshot.loan_status(&loan.id),
            covenant_count: snapshot.active_covenants_for(&loan.id).count(),
        }
    }
}

/// Views for every covenant of a loan, ordered by covenant name then id.
#[must_use]
pub fn covenant_views_for_loan(
    snapshot: &PortfolioSnapshot,
    loan: &covenantiq_core::LoanId,
) -> Vec<CovenantView> {
    let mut views: Vec<CovenantView> = snapshot
        .covenants_for(loan)
        .map(|c| CovenantView::build(snapshot, c))
        .collect();
    views.sort_by(|a, b| {
        a.covenant
            .covenant_name
            .cmp(&b.covenant.covenant_name)
            .then_with(|| a.covenant.id.cmp(&b.covenant.id))
    });
    views
}

/// Views for every loan, most recently created first.
#[must_use]
pub fn loan_views(snapshot: &PortfolioSnapshot) -> Vec<LoanView> {
    let mut views: Vec<LoanView> = snapshot
        .loans()
        .iter()
        .map(|l| LoanView::build(snapshot, l))
        .collect();
    views.sort_by(|a, b| {
        b.loan
            .created_at
            .cmp(&a.loan.created_at)
            .then_with(|| a.loan.id.cmp(&b.loan.id))
    });
    views
}
