//! DashMap-backed in-memory stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use covenantiq_core::{
    Alert, AlertId, AlertKey, Covenant, CovenantId, CovenantMeasurement, LoanAgreement, LoanId,
};
use covenantiq_traits::error::TraitError;
use covenantiq_traits::storage::{AlertStore, CovenantStore, LoanStore, MeasurementStore};

// =============================================================================
// LOANS
// =============================================================================

/// In-memory loan store.
#[derive(Default)]
pub struct InMemoryLoanStore {
    loans: DashMap<LoanId, LoanAgreement>,
}

impl InMemoryLoanStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn get(&self, id: &LoanId) -> Result<Option<LoanAgreement>, TraitError> {
        Ok(self.loans.get(id).map(|l| l.clone()))
    }

    async fn list(&self) -> Result<Vec<LoanAgreement>, TraitError> {
        let mut loans: Vec<LoanAgreement> = self.loans.iter().map(|r| r.value().clone()).collect();
        loans.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(loans)
    }

    async fn save(&self, loan: &LoanAgreement) -> Result<(), TraitError> {
        self.loans.insert(loan.id.clone(), loan.clone());
        Ok(())
    }

    async fn delete(&self, id: &LoanId) -> Result<bool, TraitError> {
        Ok(self.loans.remove(id).is_some())
    }
}

// =============================================================================
// COVENANTS
// =============================================================================

/// In-memory covenant store.
#[derive(Default)]
pub struct InMemoryCovenantStore {
    covenants: DashMap<CovenantId, Covenant>,
}

impl InMemoryCovenantStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CovenantStore for InMemoryCovenantStore {
    async fn get(&self, id: &CovenantId) -> Result<Option<Covenant>, TraitError> {
        Ok(self.covenants.get(id).map(|c| c.clone()))
    }

    async fn list(&self) -> Result<Vec<Covenant>, TraitError> {
        let mut covenants: Vec<Covenant> =
            self.covenants.iter().map(|r| r.value().clone()).collect();
        covenants.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(covenants)
    }

    async fn list_for_loan(&self, loan_id: &LoanId) -> Result<Vec<Covenant>, TraitError> {
        let mut covenants: Vec<Covenant> = self
            .covenants
            .iter()
            .filter(|r| &r.value().loan_id == loan_id)
            .map(|r| r.value().clone())
            .collect();
        covenants.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(covenants)
    }

    async fn save(&self, covenant: &Covenant) -> Result<(), TraitError> {
        self.covenants.insert(covenant.id.clone(), covenant.clone());
        Ok(())
    }

    async fn delete_for_loan(&self, loan_id: &LoanId) -> Result<Vec<CovenantId>, TraitError> {
        let ids: Vec<CovenantId> = self
            .covenants
            .iter()
            .filter(|r| &r.value().loan_id == loan_id)
            .map(|r| r.key().clone())
            .collect();
        for id in &ids {
            self.covenants.remove(id);
        }
        Ok(ids)
    }
}

// =============================================================================
// MEASUREMENTS
// =============================================================================

/// In-memory append-only measurement store.
///
/// Rows are kept per covenant in ascending date order.
#[derive(Default)]
pub struct InMemoryMeasurementStore {
    history: DashMap<CovenantId, Vec<CovenantMeasurement>>,
}

impl InMemoryMeasurementStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MeasurementStore for InMemoryMeasurementStore {
    async fn history(
        &self,
        covenant_id: &CovenantId,
    ) -> Result<Vec<CovenantMeasurement>, TraitError> {
        Ok(self
            .history
            .get(covenant_id)
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }

    async fn list(&self) -> Result<Vec<CovenantMeasurement>, TraitError> {
        let mut all: Vec<CovenantMeasurement> = self
            .history
            .iter()
            .flat_map(|r| r.value().clone())
            .collect();
        all.sort_by(|a, b| {
            a.covenant_id
                .cmp(&b.covenant_id)
                .then(a.measurement_date.cmp(&b.measurement_date))
        });
        Ok(all)
    }

    async fn latest(
        &self,
        covenant_id: &CovenantId,
    ) -> Result<Option<CovenantMeasurement>, TraitError> {
        Ok(self
            .history
            .get(covenant_id)
            .and_then(|rows| rows.last().cloned()))
    }

    async fn append(&self, measurement: &CovenantMeasurement) -> Result<(), TraitError> {
        let mut rows = self
            .history
            .entry(measurement.covenant_id.clone())
            .or_default();
        match rows.binary_search_by_key(&measurement.measurement_date, |m| m.measurement_date) {
            Ok(_) => Err(TraitError::AlreadyExists(format!(
                "measurement for covenant {} on {}",
                measurement.covenant_id, measurement.measurement_date
            ))),
            Err(pos) => {
                rows.insert(pos, measurement.clone());
                Ok(())
            }
        }
    }
}

// =============================================================================
// ALERTS
// =============================================================================

/// In-memory alert store with per-key compare-and-swap.
///
/// `by_key` maps each `(covenant, alert type)` to its single alert row. A
/// conditional write holds the key's entry lock and then the row's entry lock,
/// so writers for the same key are serialized. Read and resolve actions only
/// take the row lock.
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: DashMap<AlertId, Alert>,
    by_key: DashMap<AlertKey, AlertId>,
}

impl InMemoryAlertStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn conflict(key: &AlertKey, expected: Option<u64>, found: Option<u64>) -> TraitError {
        let show = |v: Option<u64>| v.map_or_else(|| "none".to_string(), |v| v.to_string());
        TraitError::Conflict(format!(
            "alert {key}: expected version {}, found {}",
            show(expected),
            show(found)
        ))
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn get(&self, id: &AlertId) -> Result<Option<Alert>, TraitError> {
        Ok(self.alerts.get(id).map(|a| a.clone()))
    }

    async fn find_by_key(&self, key: &AlertKey) -> Result<Option<Alert>, TraitError> {
        let Some(id) = self.by_key.get(key).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.alerts.get(&id).map(|a| a.clone()))
    }

    async fn list(&self) -> Result<Vec<Alert>, TraitError> {
        let mut alerts: Vec<Alert> = self.alerts.iter().map(|r| r.value().clone()).collect();
        alerts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(alerts)
    }

    /// The stored row gets `expected_version + 1` (or 1 for a new row)
    /// regardless of the version carried by `alert`.
    async fn upsert_if_version(
        &self,
        alert: &Alert,
        expected_version: Option<u64>,
    ) -> Result<(), TraitError> {
        let key = alert
            .key()
            .ok_or_else(|| TraitError::InvalidInput(format!("alert {} has no covenant", alert.id)))?;

        let mut row = alert.clone();
        row.version = expected_version.map_or(1, |v| v + 1);

        match self.by_key.entry(key.clone()) {
            Entry::Vacant(slot) => {
                if expected_version.is_some() {
                    return Err(Self::conflict(&key, expected_version, None));
                }
                self.alerts.insert(row.id.clone(), row);
                slot.insert(alert.id.clone());
                Ok(())
            }
            Entry::Occupied(slot) => {
                if slot.get() != &alert.id {
                    return Err(TraitError::Conflict(format!(
                        "alert {key} is held by {}, not {}",
                        slot.get(),
                        alert.id
                    )));
                }
                match self.alerts.entry(alert.id.clone()) {
                    Entry::Occupied(mut stored) => {
                        let found = stored.get().version;
                        if expected_version != Some(found) {
                            return Err(Self::conflict(&key, expected_version, Some(found)));
                        }
                        stored.insert(row);
                        Ok(())
                    }
                    Entry::Vacant(_) => Err(Self::conflict(&key, expected_version, None)),
                }
            }
        }
    }

    async fn mark_read(&self, id: &AlertId) -> Result<Alert, TraitError> {
        let mut alert = self
            .alerts
            .get_mut(id)
            .ok_or_else(|| TraitError::NotFound(format!("alert {id}")))?;
        if !alert.is_read {
            alert.is_read = true;
            alert.updated_at = Utc::now();
            alert.version += 1;
        }
        Ok(alert.clone())
    }

    async fn resolve(&self, id: &AlertId, at: DateTime<Utc>) -> Result<Alert, TraitError> {
        let mut alert = self
            .alerts
            .get_mut(id)
            .ok_or_else(|| TraitError::NotFound(format!("alert {id}")))?;
        if !alert.is_resolved {
            alert.is_resolved = true;
            alert.is_read = true;
            alert.resolved_at = Some(at);
            alert.updated_at = at;
            alert.version += 1;
        }
        Ok(alert.clone())
    }

    async fn detach(
        &self,
        loan_id: &LoanId,
        covenant_ids: &[CovenantId],
    ) -> Result<usize, TraitError> {
        self.by_key
            .retain(|key, _| !covenant_ids.contains(&key.covenant_id));

        let mut touched = 0;
        for mut entry in self.alerts.iter_mut() {
            let alert = entry.value_mut();
            let loan_hit = alert.loan_id.as_ref() == Some(loan_id);
            let covenant_hit = alert
                .covenant_id
                .as_ref()
                .is_some_and(|c| covenant_ids.contains(c));
            if loan_hit || covenant_hit {
                if loan_hit {
                    alert.loan_id = None;
                }
                if covenant_hit {
                    alert.covenant_id = None;
                }
                alert.version += 1;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenantiq_core::{AlertSeverity, AlertType, ComplianceStatus, Date, MeasurementId};
    use rust_decimal_macros::dec;

    fn alert(id: &str, covenant: &str) -> Alert {
        let now = Utc::now();
        Alert {
            id: AlertId::new(id),
            covenant_id: Some(CovenantId::new(covenant)),
            loan_id: Some(LoanId::new("loan-1")),
            alert_type: AlertType::Prediction,
            severity: AlertSeverity::Medium,
            title: "Leverage breach predicted".into(),
            message: "Leverage ratio projected to exceed 3.50x".into(),
            predicted_breach_date: Date::from_ymd(2026, 3, 1).ok(),
            days_until_breach: Some(40),
            confidence: Some(0.9),
            is_read: false,
            is_resolved: false,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            version: 0,
        }
    }

    fn measurement(covenant: &str, y: i32, m: u32, d: u32, value: f64) -> CovenantMeasurement {
        CovenantMeasurement {
            id: MeasurementId::generate(),
            covenant_id: CovenantId::new(covenant),
            measurement_date: Date::from_ymd(y, m, d).unwrap(),
            actual_value: value,
            threshold_value: Some(3.5),
            threshold_operator: None,
            status: ComplianceStatus::Compliant,
            distance_to_breach: None,
            notes: None,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_loan_crud() {
        let store = InMemoryLoanStore::new();
        let loan = LoanAgreement::new("loan-1", "Term Loan A", "Acme Corp", dec!(5000000));
        store.save(&loan).await.unwrap();

        assert_eq!(store.get(&LoanId::new("loan-1")).await.unwrap(), Some(loan));
        assert_eq!(store.list().await.unwrap().len(), 1);
        assert!(store.delete(&LoanId::new("loan-1")).await.unwrap());
        assert!(!store.delete(&LoanId::new("loan-1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_covenants_by_loan() {
        let store = InMemoryCovenantStore::new();
        store
            .save(&Covenant::new("c2", "loan-1", "leverage", "Max Leverage"))
            .await
            .unwrap();
        store
            .save(&Covenant::new("c1", "loan-1", "coverage", "Min ICR"))
            .await
            .unwrap();
        store
            .save(&Covenant::new("c3", "loan-2", "liquidity", "Min Cash"))
            .await
            .unwrap();

        let for_loan = store.list_for_loan(&LoanId::new("loan-1")).await.unwrap();
        let ids: Vec<&str> = for_loan.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);

        let removed = store.delete_for_loan(&LoanId::new("loan-1")).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_measurements_sorted_and_unique() {
        let store = InMemoryMeasurementStore::new();
        store.append(&measurement("c1", 2025, 3, 31, 3.1)).await.unwrap();
        store.append(&measurement("c1", 2024, 12, 31, 2.9)).await.unwrap();
        store.append(&measurement("c1", 2025, 6, 30, 3.3)).await.unwrap();

        let history = store.history(&CovenantId::new("c1")).await.unwrap();
        let values: Vec<f64> = history.iter().map(|m| m.actual_value).collect();
        assert_eq!(values, vec![2.9, 3.1, 3.3]);

        let latest = store.latest(&CovenantId::new("c1")).await.unwrap().unwrap();
        assert_eq!(latest.actual_value, 3.3);

        let dup = store.append(&measurement("c1", 2025, 3, 31, 9.9)).await;
        assert!(matches!(dup, Err(TraitError::AlreadyExists(_))));
        assert_eq!(store.history(&CovenantId::new("c1")).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_alert_insert_then_cas_update() {
        let store = InMemoryAlertStore::new();
        let a = alert("a1", "c1");
        store.upsert_if_version(&a, None).await.unwrap();

        let stored = store.get(&a.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);

        // A second insert for the same key is rejected.
        let dup = alert("a2", "c1");
        assert!(matches!(
            store.upsert_if_version(&dup, None).await,
            Err(TraitError::Conflict(_))
        ));

        let mut updated = stored.clone();
        updated.days_until_breach = Some(20);
        store.upsert_if_version(&updated, Some(1)).await.unwrap();

        // Stale version loses.
        assert!(matches!(
            store.upsert_if_version(&updated, Some(1)).await,
            Err(TraitError::Conflict(_))
        ));

        let key = AlertKey::new("c1", AlertType::Prediction);
        let found = store.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(found.version, 2);
        assert_eq!(found.days_until_breach, Some(20));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_and_resolve_bump_version() {
        let store = InMemoryAlertStore::new();
        let a = alert("a1", "c1");
        store.upsert_if_version(&a, None).await.unwrap();

        let read = store.mark_read(&a.id).await.unwrap();
        assert!(read.is_read);
        assert_eq!(read.version, 2);

        let at = Utc::now();
        let resolved = store.resolve(&a.id, at).await.unwrap();
        assert!(resolved.is_resolved);
        assert_eq!(resolved.resolved_at, Some(at));
        assert_eq!(resolved.version, 3);

        // A writer holding the pre-resolve version must retry.
        assert!(matches!(
            store.upsert_if_version(&a, Some(1)).await,
            Err(TraitError::Conflict(_))
        ));

        assert!(matches!(
            store.mark_read(&AlertId::new("missing")).await,
            Err(TraitError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_detach_clears_references() {
        let store = InMemoryAlertStore::new();
        store.upsert_if_version(&alert("a1", "c1"), None).await.unwrap();
        store.upsert_if_version(&alert("a2", "c9"), None).await.unwrap();

        let touched = store
            .detach(&LoanId::new("loan-1"), &[CovenantId::new("c1")])
            .await
            .unwrap();
        assert_eq!(touched, 2);

        let a1 = store.get(&AlertId::new("a1")).await.unwrap().unwrap();
        assert!(a1.covenant_id.is_none());
        assert!(a1.loan_id.is_none());
        let a2 = store.get(&AlertId::new("a2")).await.unwrap().unwrap();
        assert_eq!(a2.covenant_id, Some(CovenantId::new("c9")));
        assert!(a2.loan_id.is_none());

        let key = AlertKey::new("c1", AlertType::Prediction);
        assert!(store.find_by_key(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_keep_one_row() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryAlertStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .upsert_if_version(&alert(&format!("a{i}"), "c1"), None)
                    .await
                    .is_ok()
            }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
