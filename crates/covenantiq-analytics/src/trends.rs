//! Trend aggregation over calendar months.
//!
//! Measurements are bucketed by calendar month inside a period. Months with
//! no measurement carry the previous month's aggregate forward (or the last
//! observation before the period starts); a month is zero only
//! when nothing was ever measured before it. The current and previous period
//! series are always returned with the same length, aligned by month offset
//! from each period's start, so they can be drawn on one axis.

use covenantiq_core::{CovenantMeasurement, Date};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, AnalyticsResult};

// ============================================================================
// INPUT TYPES
// ============================================================================

/// A dated numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Observation date.
    pub date: Date,
    /// Observed value.
    pub value: f64,
}

impl Observation {
    /// Creates an observation.
    #[must_use]
    pub fn new(date: Date, value: f64) -> Self {
        Self { date, value }
    }
}

impl From<&CovenantMeasurement> for Observation {
    fn from(m: &CovenantMeasurement) -> Self {
        Self::new(m.measurement_date, m.actual_value)
    }
}

/// An inclusive date range covering whole or partial calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    start: Date,
    end: Date,
}

impl Period {
    /// Creates a period; `start` must not be after `end`.
    pub fn new(start: Date, end: Date) -> AnalyticsResult<Self> {
        if start > end {
            return Err(AnalyticsError::invalid_period(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `months` calendar months ending with the month containing `end`.
    pub fn trailing_months(end: Date, months: u32) -> AnalyticsResult<Self> {
        if months == 0 {
            return Err(AnalyticsError::invalid_period("month count must be positive"));
        }
        let offset = i32::try_from(months - 1)
            .map_err(|_| AnalyticsError::invalid_period("month count out of range"))?;
        let start = end.add_months(-offset)?.start_of_month();
        Self::new(start, end)
    }

    /// The period of equal month count immediately before this one.
    pub fn preceding(&self) -> AnalyticsResult<Self> {
        let count = i32::try_from(self.month_count())
            .map_err(|_| AnalyticsError::invalid_period("month count out of range"))?;
        let end = self.start.add_days(-1);
        let start = self.start.start_of_month().add_months(-count)?;
        Self::new(start, end)
    }

    /// First day.
    #[must_use]
    pub fn start(&self) -> Date {
        self.start
    }

    /// Last day.
    #[must_use]
    pub fn end(&self) -> Date {
        self.end
    }

    /// Whether `date` falls inside the period.
    #[must_use]
    pub fn contains(&self, date: Date) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar months touched by the period.
    #[must_use]
    pub fn month_count(&self) -> usize {
        usize::try_from(self.end.months_since(&self.start) + 1).unwrap_or(0)
    }

    /// Index of the month containing `date`, relative to the period start.
    #[must_use]
    pub fn month_index(&self, date: Date) -> Option<usize> {
        if !self.contains(date) {
            return None;
        }
        usize::try_from(date.months_since(&self.start)).ok()
    }

    /// The first day of every month in the period.
    #[must_use]
    pub fn month_starts(&self) -> Vec<Date> {
        let first = self.start.start_of_month();
        (0..self.month_count())
            .filter_map(|i| i32::try_from(i).ok())
            .filter_map(|i| first.add_months(i).ok())
            .collect()
    }

    /// The last day of every month, capped at the period end.
    #[must_use]
    pub fn month_ends(&self) -> Vec<Date> {
        self.month_starts()
            .into_iter()
            .map(|m| m.end_of_month().min(self.end))
            .collect()
    }

    /// Short month labels ("Jan" .. "Dec").
    #[must_use]
    pub fn month_labels(&self) -> Vec<String> {
        self.month_starts().iter().map(Date::month_label).collect()
    }
}

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// How observations inside one month collapse to a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationRule {
    /// Latest observation in the month.
    #[default]
    Last,
    /// Arithmetic mean.
    Mean,
    /// Largest value.
    Max,
    /// Smallest value.
    Min,
}

impl AggregationRule {
    fn apply(self, values: &[f64]) -> Option<f64> {
        let last = *values.last()?;
        Some(match self {
            AggregationRule::Last => last,
            AggregationRule::Mean => values.iter().sum::<f64>() / values.len() as f64,
            AggregationRule::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregationRule::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        })
    }
}

/// Aligned current and previous period series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    /// Month labels of the current period.
    pub months: Vec<String>,
    /// Current period values, one per month.
    pub current_period: Vec<f64>,
    /// Previous period values aligned by month offset.
    pub previous_period: Vec<f64>,
}

/// An implausibly long interval between consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataGap {
    /// Date before the gap.
    pub from: Date,
    /// Date after the gap.
    pub to: Date,
    /// Length in days.
    pub days: i64,
}

impl From<DataGap> for AnalyticsError {
    fn from(gap: DataGap) -> Self {
        AnalyticsError::DataGap {
            from: gap.from,
            to: gap.to,
            days: gap.days,
        }
    }
}

/// Series plus bucketing diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAggregation {
    /// The aligned series.
    pub series: TrendSeries,
    /// Observations bucketed into each current-period month.
    pub current_counts: Vec<usize>,
    /// Observations bucketed into each previous-period month.
    pub previous_counts: Vec<usize>,
    /// Gaps found in the history; aggregation carried values across them.
    pub gaps: Vec<DataGap>,
}

impl TrendAggregation {
    /// Total observations that landed in either period.
    #[must_use]
    pub fn bucketed_total(&self) -> usize {
        self.current_counts.iter().sum::<usize>() + self.previous_counts.iter().sum::<usize>()
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

/// Buckets observation history into monthly series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendAggregator {
    rule: AggregationRule,
    max_gap_days: i64,
}

impl Default for TrendAggregator {
    fn default() -> Self {
        Self {
            rule: AggregationRule::Last,
            max_gap_days: 400,
        }
    }
}

impl TrendAggregator {
    /// Creates an aggregator with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the in-month aggregation rule.
    #[must_use]
    pub fn with_rule(mut self, rule: AggregationRule) -> Self {
        self.rule = rule;
        self
    }

    /// Sets the gap length above which a gap is reported.
    #[must_use]
    pub fn with_max_gap_days(mut self, days: i64) -> Self {
        self.max_gap_days = days;
        self
    }

    /// Aggregates over explicit period bounds.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::InvalidPeriod` if either period is inverted.
    pub fn aggregate_bounds(
        &self,
        observations: &[Observation],
        period_start: Date,
        period_end: Date,
        previous_start: Date,
        previous_end: Date,
    ) -> AnalyticsResult<TrendAggregation> {
        let current = Period::new(period_start, period_end)?;
        let previous = Period::new(previous_start, previous_end)?;
        Ok(self.aggregate(observations, &current, &previous))
    }

    /// Aggregates observations into the current and previous period series.
    ///
    /// Observations need not be sorted. Gaps longer than the configured limit
    /// are reported in the result and logged; they never fail the call.
    #[must_use]
    pub fn aggregate(
        &self,
        observations: &[Observation],
        current: &Period,
        previous: &Period,
    ) -> TrendAggregation {
        let mut sorted: Vec<Observation> = observations
            .iter()
            .copied()
            .filter(|o| o.value.is_finite())
            .collect();
        sorted.sort_by_key(|o| o.date);

        let (mut current_values, current_counts) = self.bucket(&sorted, current);
        let (mut previous_values, previous_counts) = self.bucket(&sorted, previous);

        let width = current_values.len();
        align(&mut previous_values, width);
        align(&mut current_values, width);

        let gaps = self.find_gaps(&sorted, current, previous);
        for gap in &gaps {
            log::warn!(
                "data gap of {} days between {} and {}; carrying values forward",
                gap.days,
                gap.from,
                gap.to
            );
        }

        TrendAggregation {
            series: TrendSeries {
                months: current.month_labels(),
                current_period: current_values,
                previous_period: previous_values,
            },
            current_counts,
            previous_counts,
            gaps,
        }
    }

    /// One value and one count per month of `period`.
    fn bucket(&self, sorted: &[Observation], period: &Period) -> (Vec<f64>, Vec<usize>) {
        let months = period.month_count();
        let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); months];

        let mut last_known = None;
        for obs in sorted {
            if obs.date < period.start() {
                last_known = Some(obs.value);
            } else if let Some(idx) = period.month_index(obs.date) {
                buckets[idx].push(obs.value);
            }
        }

        let mut values = Vec::with_capacity(months);
        let mut counts = Vec::with_capacity(months);
        for bucket in &buckets {
            counts.push(bucket.len());
            match self.rule.apply(bucket) {
                Some(v) => {
                    values.push(v);
                    last_known = Some(v);
                }
                None => values.push(last_known.unwrap_or(0.0)),
            }
        }
        (values, counts)
    }

    fn find_gaps(&self, sorted: &[Observation], current: &Period, previous: &Period) -> Vec<DataGap> {
        let lower = current.start().min(previous.start());
        let upper = current.end().max(previous.end());
        sorted
            .windows(2)
            .filter_map(|pair| {
                let (a, b) = (pair[0].date, pair[1].date);
                let days = a.days_between(&b);
                (days > self.max_gap_days && b >= lower && a <= upper)
                    .then_some(DataGap { from: a, to: b, days })
            })
            .collect()
    }
}

/// Pads with the last value, or truncates, to `width`.
fn align(values: &mut Vec<f64>, width: usize) {
    let fill = values.last().copied().unwrap_or(0.0);
    values.resize(width, fill);
}

// ============================================================================
// DELTAS
// ============================================================================

/// Relative change in percent; zero when `previous` is zero.
#[must_use]
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous.abs() * 100.0
    }
}

/// Signed change in a status count: `(current - previous) / max(previous, 1) * 100`.
#[must_use]
pub fn status_change_pct(current: usize, previous: usize) -> f64 {
    let denominator = previous.max(1) as f64;
    (current as f64 - previous as f64) / denominator * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn d(s: &str) -> Date {
        Date::parse(s).unwrap()
    }

    fn obs(s: &str, v: f64) -> Observation {
        Observation::new(d(s), v)
    }

    #[test]
    fn test_trailing_and_preceding_periods() {
        let current = Period::trailing_months(d("2025-06-15"), 6).unwrap();
        assert_eq!(current.start(), d("2025-01-01"));
        assert_eq!(current.month_count(), 6);
        assert_eq!(current.month_labels(), vec!["Jan", "Feb", "Mar", "Apr", "May", "Jun"]);

        let previous = current.preceding().unwrap();
        assert_eq!(previous.start(), d("2024-07-01"));
        assert_eq!(previous.end(), d("2024-12-31"));
        assert_eq!(previous.month_count(), 6);
    }

    #[test]
    fn test_month_ends_capped_at_period_end() {
        let period = Period::new(d("2025-01-10"), d("2025-03-15")).unwrap();
        assert_eq!(
            period.month_ends(),
            vec![d("2025-01-31"), d("2025-02-28"), d("2025-03-15")]
        );
    }

    #[test]
    fn test_inverted_period_rejected() {
        assert!(Period::new(d("2025-02-01"), d("2025-01-01")).is_err());
        assert!(Period::trailing_months(d("2025-02-01"), 0).is_err());
    }

    #[test]
    fn test_carry_forward() {
        let history = vec![
            obs("2024-12-15", 2.0),
            obs("2025-02-10", 2.4),
            obs("2025-02-20", 2.6),
            obs("2025-05-01", 3.1),
        ];
        let current = Period::trailing_months(d("2025-06-30"), 6).unwrap();
        let previous = current.preceding().unwrap();
        let agg = TrendAggregator::new().aggregate(&history, &current, &previous);

        // Jan carries December, Feb takes the last value, Mar/Apr carry Feb, Jun carries May.
        assert_eq!(agg.series.current_period, vec![2.0, 2.6, 2.6, 2.6, 3.1, 3.1]);
        // Nothing before December, so Jul..Nov are zero.
        assert_eq!(agg.series.previous_period, vec![0.0, 0.0, 0.0, 0.0, 0.0, 2.0]);
        assert_eq!(agg.current_counts, vec![0, 2, 0, 0, 1, 0]);
        assert_eq!(agg.bucketed_total(), 4);
    }

    #[test]
    fn test_mean_rule() {
        let history = vec![obs("2025-01-05", 1.0), obs("2025-01-25", 3.0)];
        let period = Period::new(d("2025-01-01"), d("2025-01-31")).unwrap();
        let previous = period.preceding().unwrap();
        let agg = TrendAggregator::new()
            .with_rule(AggregationRule::Mean)
            .aggregate(&history, &period, &previous);
        assert_eq!(agg.series.current_period, vec![2.0]);
    }

    #[test]
    fn test_empty_months_carry_the_aggregate() {
        let history = vec![obs("2025-01-05", 1.0), obs("2025-01-25", 3.0)];
        let period = Period::new(d("2025-01-01"), d("2025-03-31")).unwrap();
        let previous = period.preceding().unwrap();

        let mean = TrendAggregator::new()
            .with_rule(AggregationRule::Mean)
            .aggregate(&history, &period, &previous);
        assert_eq!(mean.series.current_period, vec![2.0, 2.0, 2.0]);

        let max = TrendAggregator::new()
            .with_rule(AggregationRule::Max)
            .aggregate(&history, &period, &previous);
        assert_eq!(max.series.current_period, vec![3.0, 3.0, 3.0]);

        let min = TrendAggregator::new()
            .with_rule(AggregationRule::Min)
            .aggregate(&history, &period, &previous);
        assert_eq!(min.series.current_period, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_unequal_periods_are_aligned() {
        let history = vec![obs("2024-10-01", 5.0), obs("2025-01-15", 7.0)];
        let agg = TrendAggregator::new()
            .aggregate_bounds(
                &history,
                d("2025-01-01"),
                d("2025-04-30"),
                d("2024-10-01"),
                d("2024-11-30"),
            )
            .unwrap();
        assert_eq!(agg.series.months.len(), 4);
        assert_eq!(agg.series.previous_period, vec![5.0, 5.0, 5.0, 5.0]);
        assert_eq!(agg.previous_counts, vec![1, 0]);
    }

    #[test]
    fn test_gap_reported_not_fatal() {
        let history = vec![obs("2023-01-01", 1.0), obs("2025-03-01", 2.0)];
        let current = Period::trailing_months(d("2025-03-31"), 3).unwrap();
        let previous = current.preceding().unwrap();
        let agg = TrendAggregator::new().aggregate(&history, &current, &previous);
        assert_eq!(agg.gaps.len(), 1);
        assert_eq!(agg.series.current_period, vec![1.0, 1.0, 2.0]);
        let err: AnalyticsError = agg.gaps[0].into();
        assert!(matches!(err, AnalyticsError::DataGap { .. }));
    }

    #[test]
    fn test_idempotent() {
        let history = vec![obs("2025-03-01", 1.5), obs("2025-01-01", 1.0)];
        let current = Period::trailing_months(d("2025-03-31"), 3).unwrap();
        let previous = current.preceding().unwrap();
        let aggregator = TrendAggregator::new();
        assert_eq!(
            aggregator.aggregate(&history, &current, &previous),
            aggregator.aggregate(&history, &current, &previous)
        );
    }

    #[test]
    fn test_deltas() {
        assert_relative_eq!(status_change_pct(6, 4), 50.0);
        assert_relative_eq!(status_change_pct(3, 0), 300.0);
        assert_relative_eq!(status_change_pct(0, 2), -100.0);
        assert_relative_eq!(percentage_change(110.0, 100.0), 10.0);
        assert_relative_eq!(percentage_change(50.0, 0.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_series_lengths_and_counts(
            offsets in proptest::collection::vec((0i64..900, -10.0f64..10.0), 0..40),
            months in 1u32..13,
        ) {
            let base = d("2023-01-01");
            let history: Vec<Observation> = offsets
                .iter()
                .map(|(o, v)| Observation::new(base.add_days(*o), *v))
                .collect();
            let current = Period::trailing_months(d("2025-06-30"), months).unwrap();
            let previous = current.preceding().unwrap();
            let agg = TrendAggregator::new().aggregate(&history, &current, &previous);

            prop_assert_eq!(agg.series.current_period.len(), agg.series.months.len());
            prop_assert_eq!(agg.series.previous_period.len(), agg.series.months.len());

            let in_current = history.iter().filter(|o| current.contains(o.date)).count();
            let in_previous = history.iter().filter(|o| previous.contains(o.date)).count();
            prop_assert_eq!(agg.current_counts.iter().sum::<usize>(), in_current);
            prop_assert_eq!(agg.previous_counts.iter().sum::<usize>(), in_previous);
        }
    }
}
