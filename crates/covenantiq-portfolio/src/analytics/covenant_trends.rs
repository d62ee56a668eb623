//! Period-over-period change in covenant status counts.

use covenantiq_analytics::status_change_pct;
use covenantiq_core::{ComplianceStatus, Date};
use serde::{Deserialize, Serialize};

use crate::types::PortfolioSnapshot;

/// Number of covenants in each status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Compliant covenants.
    pub compliant: usize,
    /// Warning covenants.
    pub warning: usize,
    /// Breached covenants.
    pub breach: usize,
    /// Covenants with unknown status.
    pub unknown: usize,
}

impl StatusCounts {
    /// Adds one covenant in `status`.
    pub fn record(&mut self, status: ComplianceStatus) {
        match status {
            ComplianceStatus::Compliant => self.compliant += 1,
            ComplianceStatus::Warning => self.warning += 1,
            ComplianceStatus::Breach => self.breach += 1,
            ComplianceStatus::Unknown => self.unknown += 1,
        }
    }

    /// Count for one status.
    #[must_use]
    pub fn get(&self, status: ComplianceStatus) -> usize {
        match status {
            ComplianceStatus::Compliant => self.compliant,
            ComplianceStatus::Warning => self.warning,
            ComplianceStatus::Breach => self.breach,
            ComplianceStatus::Unknown => self.unknown,
        }
    }

    /// Sum of two tallies.
    #[must_use]
    pub fn merge(self, other: StatusCounts) -> StatusCounts {
        StatusCounts {
            compliant: self.compliant + other.compliant,
            warning: self.warning + other.warning,
            breach: self.breach + other.breach,
            unknown: self.unknown + other.unknown,
        }
    }
}

/// Signed percentage changes in status counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CovenantTrends {
    /// Change in compliant count, percent.
    pub compliant_change: f64,
    /// Change in warning count, percent.
    pub warning_change: f64,
    /// Change in breach count, percent.
    pub breach_change: f64,
    /// Counts as of the current date.
    pub current: StatusCounts,
    /// Counts as of the comparison date.
    pub previous: StatusCounts,
}

/// Compares active covenant statuses on `as_of` with those on `compare_to`.
///
/// A covenant's status on a date is the status of its latest measurement on
/// or before that date.
#[must_use]
pub fn covenant_trends(snapshot: &PortfolioSnapshot, as_of: Date, compare_to: Date) -> CovenantTrends {
    let mut current = StatusCounts::default();
    let mut previous = StatusCounts::default();
    for covenant in snapshot.covenants().iter().filter(|c| c.is_active) {
        current.record(snapshot.covenant_status_as_of(covenant, as_of));
        previous.record(snapshot.covenant_status_as_of(covenant, compare_to));
    }

    CovenantTrends {
        compliant_change: status_change_pct(current.compliant, previous.compliant),
        warning_change: status_change_pct(current.warning, previous.warning),
        breach_change: status_change_pct(current.breach, previous.breach),
        current,
        previous,
    }
}
