//! Point-in-time view of the portfolio used as input to every calculation.

use std::collections::{HashMap, HashSet};

use covenantiq_core::{
    Alert, ComplianceStatus, Covenant, CovenantId, CovenantMeasurement, Date, LoanAgreement,
    LoanId, UserId,
};

/// Loans, covenants, measurement history and alerts captured together.
///
/// Measurement history is held per covenant in ascending date order.
#[derive(Debug, Clone, Default)]
pub struct PortfolioSnapshot {
    loans: Vec<LoanAgreement>,
    covenants: Vec<Covenant>,
    measurements: HashMap<CovenantId, Vec<CovenantMeasurement>>,
    alerts: Vec<Alert>,
    covenants_by_loan: HashMap<LoanId, Vec<usize>>,
}

impl PortfolioSnapshot {
    /// Builds a snapshot, indexing covenants by loan and sorting history.
    ///
    /// Covenants whose loan is absent are dropped.
    pub fn new(
        mut loans: Vec<LoanAgreement>,
        covenants: Vec<Covenant>,
        measurements: Vec<CovenantMeasurement>,
        mut alerts: Vec<Alert>,
    ) -> Self {
        loans.sort_by(|a, b| a.id.cmp(&b.id));
        let loan_ids: HashSet<&LoanId> = loans.iter().map(|l| &l.id).collect();

        let mut covenants: Vec<Covenant> = covenants
            .into_iter()
            .filter(|c| {
                let known = loan_ids.contains(&c.loan_id);
                if !known {
                    log::debug!("dropping covenant {} with unknown loan {}", c.id, c.loan_id);
                }
                known
            })
            .collect();
        covenants.sort_by(|a, b| a.id.cmp(&b.id));

        let mut covenants_by_loan: HashMap<LoanId, Vec<usize>> = HashMap::new();
        for (idx, covenant) in covenants.iter().enumerate() {
            covenants_by_loan
                .entry(covenant.loan_id.clone())
                .or_default()
                .push(idx);
        }

        let mut history: HashMap<CovenantId, Vec<CovenantMeasurement>> = HashMap::new();
        for m in measurements {
            history.entry(m.covenant_id.clone()).or_default().push(m);
        }
        for rows in history.values_mut() {
            rows.sort_by_key(|m| m.measurement_date);
        }

        alerts.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            loans,
            covenants,
            measurements: history,
            alerts,
            covenants_by_loan,
        }
    }

    /// A copy restricted to loans owned by `user`; unchanged when `None`.
    ///
    /// Alerts whose loan reference was cleared are only visible unscoped.
    #[must_use]
    pub fn scoped(&self, user: Option<&UserId>) -> Self {
        if user.is_none() {
            return self.clone();
        }
        let loans: Vec<LoanAgreement> = self
            .loans
            .iter()
            .filter(|l| l.is_visible_to(user))
            .cloned()
            .collect();
        let ids: HashSet<LoanId> = loans.iter().map(|l| l.id.clone()).collect();
        let covenants: Vec<Covenant> = self
            .covenants
            .iter()
            .filter(|c| ids.contains(&c.loan_id))
            .cloned()
            .collect();
        let cov_ids: HashSet<&CovenantId> = covenants.iter().map(|c| &c.id).collect();
        let measurements = self
            .measurements
            .iter()
            .filter(|(id, _)| cov_ids.contains(id))
            .flat_map(|(_, rows)| rows.iter().cloned())
            .collect();
        let alerts = self
            .alerts
            .iter()
            .filter(|a| a.loan_id.as_ref().is_some_and(|l| ids.contains(l)))
            .cloned()
            .collect();
        Self::new(loans, covenants, measurements, alerts)
    }

    /// All loans, ordered by id.
    #[must_use]
    pub fn loans(&self) -> &[LoanAgreement] {
        &self.loans
    }

    /// All covenants, ordered by id.
    #[must_use]
    pub fn covenants(&self) -> &[Covenant] {
        &self.covenants
    }

    /// All alerts, ordered by id.
    #[must_use]
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Looks up a loan.
    #[must_use]
    pub fn loan(&self, id: &LoanId) -> Option<&LoanAgreement> {
        self.loans.iter().find(|l| &l.id == id)
    }

    /// Looks up a covenant.
    #[must_use]
    pub fn covenant(&self, id: &CovenantId) -> Option<&Covenant> {
        self.covenants.iter().find(|c| &c.id == id)
    }

    /// Covenants belonging to a loan, ordered by id.
    pub fn covenants_for<'a>(&'a self, loan_id: &LoanId) -> impl Iterator<Item = &'a Covenant> + 'a {
        self.covenants_by_loan
            .get(loan_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.covenants[idx])
    }

    /// Active covenants belonging to a loan.
    pub fn active_covenants_for<'a>(
        &'a self,
        loan_id: &LoanId,
    ) -> impl Iterator<Item = &'a Covenant> + 'a {
        self.covenants_for(loan_id).filter(|c| c.is_active)
    }

    /// Measurement history of a covenant, oldest first.
    #[must_use]
    pub fn history(&self, covenant_id: &CovenantId) -> &[CovenantMeasurement] {
        self.measurements
            .get(covenant_id)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Most recent measurement of a covenant.
    #[must_use]
    pub fn latest_measurement(&self, covenant_id: &CovenantId) -> Option<&CovenantMeasurement> {
        self.history(covenant_id).last()
    }

    /// Most recent measurement on or before `date`.
    #[must_use]
    pub fn measurement_as_of(
        &self,
        covenant_id: &CovenantId,
        date: Date,
    ) -> Option<&CovenantMeasurement> {
        self.history(covenant_id)
            .iter()
            .rev()
            .find(|m| m.measurement_date <= date)
    }

    /// Current status of a covenant.
    ///
    /// `unknown` when the threshold is undefined or nothing has been measured.
    #[must_use]
    pub fn covenant_status(&self, covenant: &Covenant) -> ComplianceStatus {
        if covenant.threshold().is_none() {
            return ComplianceStatus::Unknown;
        }
        self.latest_measurement(&covenant.id)
            .map_or(ComplianceStatus::Unknown, |m| m.status)
    }

    /// Status of a covenant as it stood on `date`.
    #[must_use]
    pub fn covenant_status_as_of(&self, covenant: &Covenant, date: Date) -> ComplianceStatus {
        if covenant.threshold().is_none() {
            return ComplianceStatus::Unknown;
        }
        self.measurement_as_of(&covenant.id, date)
            .map_or(ComplianceStatus::Unknown, |m| m.status)
    }

    /// Worst status among a loan's active covenants.
    #[must_use]
    pub fn loan_status(&self, loan_id: &LoanId) -> ComplianceStatus {
        ComplianceStatus::worst_of(
            self.active_covenants_for(loan_id)
                .map(|c| self.covenant_status(c)),
        )
    }
}
