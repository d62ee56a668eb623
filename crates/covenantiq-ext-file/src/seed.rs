//! File-based seed data: loans with nested covenants (JSON) and measurement
//! history (CSV).
//!
//! Loaders only parse and validate records. Measurement status is derived by
//! the engine when the rows are recorded.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use covenantiq_core::{
    Covenant, CovenantId, Date, LoanAgreement, LoanId, LoanLifecycle, ThresholdOperator, UserId,
};
use covenantiq_traits::error::TraitError;

// =============================================================================
// RECORDS
// =============================================================================

/// A measurement row awaiting evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRow {
    /// Covenant measured.
    pub covenant_id: CovenantId,
    /// Test date.
    pub measurement_date: Date,
    /// Observed value.
    pub actual_value: f64,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Everything read from a seed file.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    /// Loans.
    pub loans: Vec<LoanAgreement>,
    /// Covenants of those loans.
    pub covenants: Vec<Covenant>,
    /// Measurements nested under covenants.
    pub measurements: Vec<MeasurementRow>,
}

impl SeedData {
    /// Appends rows from another source.
    pub fn extend_measurements(&mut self, rows: impl IntoIterator<Item = MeasurementRow>) {
        self.measurements.extend(rows);
    }
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    loans: Vec<LoanRecord>,
}

#[derive(Debug, Deserialize)]
struct LoanRecord {
    id: String,
    #[serde(default)]
    user_id: Option<String>,
    title: String,
    borrower_name: String,
    loan_amount: Decimal,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    origination_date: Option<Date>,
    #[serde(default)]
    maturity_date: Option<Date>,
    #[serde(default, alias = "status")]
    lifecycle: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    covenants: Vec<CovenantRecord>,
}

#[derive(Debug, Deserialize)]
struct CovenantRecord {
    id: String,
    covenant_type: String,
    covenant_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    threshold_value: Option<f64>,
    #[serde(default)]
    threshold_operator: Option<String>,
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default)]
    next_test_date: Option<Date>,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    measurements: Vec<NestedMeasurement>,
}

#[derive(Debug, Deserialize)]
struct NestedMeasurement {
    measurement_date: Date,
    actual_value: f64,
    #[serde(default)]
    notes: Option<String>,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// JSON SEED
// =============================================================================

/// Load a JSON seed file. A missing file yields empty data.
pub fn load_seed_json(path: impl AsRef<Path>) -> Result<SeedData, TraitError> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("seed file {} not found, starting empty", path.display());
        return Ok(SeedData::default());
    }
    let content = std::fs::read_to_string(path)?;
    parse_seed_json(&content)
}

/// Parse seed JSON.
///
/// A covenant with a malformed operator or an incomplete threshold pair is
/// kept without a threshold so it reports `unknown`.
pub fn parse_seed_json(content: &str) -> Result<SeedData, TraitError> {
    let file: SeedFile =
        serde_json::from_str(content).map_err(|e| TraitError::ParseError(e.to_string()))?;

    let mut data = SeedData::default();
    for record in file.loans {
        let loan_id = LoanId::new(record.id);
        let lifecycle = match record.lifecycle.as_deref() {
            None => LoanLifecycle::Active,
            Some(raw) => LoanLifecycle::from_str(raw)?,
        };

        let mut loan = LoanAgreement::new(
            loan_id.clone(),
            record.title,
            record.borrower_name,
            record.loan_amount,
        )
        .with_dates(record.origination_date, record.maturity_date)
        .with_lifecycle(lifecycle);
        if let Some(user) = record.user_id {
            loan = loan.with_user(UserId::new(user));
        }
        if let Some(currency) = record.currency {
            loan.currency = currency;
        }
        if let Some(created_at) = record.created_at {
            loan = loan.with_created_at(created_at);
        }
        loan.validate()?;

        for cov in record.covenants {
            let covenant_id = CovenantId::new(cov.id);
            let mut covenant = Covenant::new(
                covenant_id.clone(),
                loan_id.clone(),
                cov.covenant_type,
                cov.covenant_name,
            );
            covenant.description = cov.description;
            covenant.frequency = cov.frequency;
            covenant.next_test_date = cov.next_test_date;
            covenant.is_active = cov.is_active;

            match threshold_pair(&covenant_id, cov.threshold_operator.as_deref(), cov.threshold_value) {
                Some((op, value)) => covenant = covenant.with_threshold(op, value),
                None => {
                    covenant.threshold_operator = None;
                    covenant.threshold_value = None;
                }
            }

            data.measurements
                .extend(cov.measurements.into_iter().map(|m| MeasurementRow {
                    covenant_id: covenant_id.clone(),
                    measurement_date: m.measurement_date,
                    actual_value: m.actual_value,
                    notes: m.notes,
                }));
            data.covenants.push(covenant);
        }
        data.loans.push(loan);
    }

    log::debug!(
        "seed parsed: {} loans, {} covenants, {} measurements",
        data.loans.len(),
        data.covenants.len(),
        data.measurements.len()
    );
    Ok(data)
}

fn threshold_pair(
    covenant_id: &CovenantId,
    operator: Option<&str>,
    value: Option<f64>,
) -> Option<(ThresholdOperator, f64)> {
    match (operator, value) {
        (None, None) => None,
        (Some(raw), Some(value)) if value.is_finite() => match ThresholdOperator::from_str(raw) {
            Ok(op) => Some((op, value)),
            Err(e) => {
                log::warn!("covenant {covenant_id}: {e}; threshold ignored");
                None
            }
        },
        _ => {
            log::warn!("covenant {covenant_id}: incomplete threshold; threshold ignored");
            None
        }
    }
}

// =============================================================================
// CSV MEASUREMENTS
// =============================================================================

/// Load measurement rows from CSV. A missing file yields no rows.
///
/// Columns: `covenant_id,measurement_date,actual_value,notes`.
pub fn load_measurements_csv(path: impl AsRef<Path>) -> Result<Vec<MeasurementRow>, TraitError> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("measurements file {} not found", path.display());
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path)?;
    parse_measurements_csv(file)
}

/// Parse measurement rows from any CSV reader.
pub fn parse_measurements_csv(reader: impl Read) -> Result<Vec<MeasurementRow>, TraitError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<MeasurementRow>().enumerate() {
        let mut row =
            result.map_err(|e| TraitError::ParseError(format!("row {}: {e}", line + 1)))?;
        if !row.actual_value.is_finite() {
            return Err(TraitError::ParseError(format!(
                "row {}: actual_value must be finite",
                line + 1
            )));
        }
        if row.notes.as_deref().is_some_and(str::is_empty) {
            row.notes = None;
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const SEED: &str = r#"{
        "loans": [
            {
                "id": "loan-acme",
                "user_id": "user-1",
                "title": "Acme Term Loan",
                "borrower_name": "Acme Corp",
                "loan_amount": 5000000,
                "origination_date": "2024-01-15",
                "maturity_date": "2029-01-15",
                "covenants": [
                    {
                        "id": "cov-lev",
                        "covenant_type": "leverage_ratio",
                        "covenant_name": "Max Leverage",
                        "threshold_value": 3.5,
                        "threshold_operator": "less_or_equal",
                        "measurements": [
                            { "measurement_date": "2024-03-31", "actual_value": 2.8 },
                            { "measurement_date": "2024-06-30", "actual_value": 3.0, "notes": "Q2" }
                        ]
                    },
                    {
                        "id": "cov-bad",
                        "covenant_type": "coverage",
                        "covenant_name": "Min ICR",
                        "threshold_value": 2.0,
                        "threshold_operator": "at least"
                    },
                    {
                        "id": "cov-half",
                        "covenant_type": "liquidity",
                        "covenant_name": "Min Cash",
                        "threshold_value": 1000000
                    }
                ]
            },
            {
                "id": "loan-old",
                "title": "Retired Facility",
                "borrower_name": "Old Co",
                "loan_amount": 1000000,
                "status": "matured"
            }
        ]
    }"#;

    #[test]
    fn test_parse_seed() {
        let data = parse_seed_json(SEED).unwrap();
        assert_eq!(data.loans.len(), 2);
        assert_eq!(data.covenants.len(), 3);
        assert_eq!(data.measurements.len(), 2);

        let acme = &data.loans[0];
        assert_eq!(acme.loan_amount, dec!(5000000));
        assert_eq!(acme.user_id, Some(UserId::new("user-1")));
        assert_eq!(acme.currency, "USD");
        assert_eq!(data.loans[1].lifecycle, LoanLifecycle::Matured);

        let lev = &data.covenants[0];
        assert_eq!(lev.threshold(), Some((ThresholdOperator::LessOrEqual, 3.5)));
        assert_eq!(data.measurements[1].notes.as_deref(), Some("Q2"));
    }

    #[test]
    fn test_malformed_threshold_becomes_undefined() {
        let data = parse_seed_json(SEED).unwrap();
        let bad = &data.covenants[1];
        assert!(bad.threshold().is_none());
        assert!(bad.threshold_value.is_none());
        let half = &data.covenants[2];
        assert!(half.threshold().is_none());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            parse_seed_json("{ not json"),
            Err(TraitError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_csv() {
        let csv = "covenant_id,measurement_date,actual_value,notes\n\
                   cov-lev,2024-09-30,3.2,\n\
                   cov-lev, 2024-12-31 ,3.4,year end\n";
        let rows = parse_measurements_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].notes, None);
        assert_eq!(rows[1].measurement_date, Date::from_ymd(2024, 12, 31).unwrap());
        assert_eq!(rows[1].notes.as_deref(), Some("year end"));
    }

    #[test]
    fn test_csv_bad_date_reports_row() {
        let csv = "covenant_id,measurement_date,actual_value,notes\ncov-lev,31/12/2024,3.4,\n";
        match parse_measurements_csv(csv.as_bytes()) {
            Err(TraitError::ParseError(msg)) => assert!(msg.starts_with("row 1")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();

        let seed_path = dir.path().join("seed.json");
        std::fs::write(&seed_path, SEED).unwrap();
        let data = load_seed_json(&seed_path).unwrap();
        assert_eq!(data.loans.len(), 2);

        let csv_path = dir.path().join("measurements.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "covenant_id,measurement_date,actual_value,notes").unwrap();
        writeln!(file, "cov-lev,2024-09-30,3.2,").unwrap();
        drop(file);
        assert_eq!(load_measurements_csv(&csv_path).unwrap().len(), 1);

        let missing = dir.path().join("absent.json");
        assert!(load_seed_json(&missing).unwrap().loans.is_empty());
        assert!(load_measurements_csv(dir.path().join("absent.csv"))
            .unwrap()
            .is_empty());
    }
}
