//! Alert listing and ordering.

use covenantiq_core::{Alert, AlertSeverity};
use serde::{Deserialize, Serialize};

/// Filter for the open alert feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFilter {
    /// Only alerts not yet read.
    pub unread_only: bool,
    /// Only alerts of this severity.
    pub severity: Option<AlertSeverity>,
    /// Maximum alerts returned.
    pub limit: usize,
}

impl Default for AlertFilter {
    fn default() -> Self {
        Self {
            unread_only: false,
            severity: None,
            limit: 50,
        }
    }
}

/// Open alerts matching `filter`, newest first.
#[must_use]
pub fn open_alerts(alerts: &[Alert], filter: &AlertFilter) -> Vec<Alert> {
    let mut open: Vec<Alert> = alerts
        .iter()
        .filter(|a| a.is_open())
        .filter(|a| !filter.unread_only || !a.is_read)
        .filter(|a| filter.severity.map_or(true, |s| a.severity == s))
        .cloned()
        .collect();
    open.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    open.truncate(filter.limit);
    open
}

/// Open alerts by severity (high first), then soonest breach, then newest.
#[must_use]
pub fn critical_alerts(alerts: &[Alert], limit: usize) -> Vec<Alert> {
    let mut open: Vec<Alert> = alerts.iter().filter(|a| a.is_open()).cloned().collect();
    open.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| {
                let da = a.days_until_breach.unwrap_or(i64::MAX);
                let db = b.days_until_breach.unwrap_or(i64::MAX);
                da.cmp(&db)
            })
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    open.truncate(limit);
    open
}
