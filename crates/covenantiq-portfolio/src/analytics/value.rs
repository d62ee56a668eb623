//! Portfolio value and monthly value trends.
//!
//! The value on a date is the sum of `loan_amount` over active loans
//! outstanding on that date. Monthly series use the same calendar-month
//! bucketing as the covenant trend aggregator, sampling each month's end.

use covenantiq_analytics::{percentage_change, Period};
use covenantiq_core::Date;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioResult;
use crate::types::PortfolioSnapshot;

/// Current versus previous-period portfolio value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValue {
    /// Outstanding principal on the as-of date.
    pub current_value: Decimal,
    /// Outstanding principal at the end of the previous period.
    pub previous_value: Decimal,
    /// Relative change in percent; zero when the previous value is zero.
    pub change_percentage: f64,
    /// Absolute change.
    pub change_amount: Decimal,
}

/// Monthly outstanding principal for two aligned periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTrends {
    /// Month labels of the current period.
    pub months: Vec<String>,
    /// Month-end values in the current period.
    pub current_period: Vec<f64>,
    /// Month-end values in the previous period, aligned by offset.
    pub previous_period: Vec<f64>,
}

fn outstanding_on(snapshot: &PortfolioSnapshot, date: Date) -> Decimal {
    snapshot
        .loans()
        .iter()
        .filter(|l| l.is_outstanding_on(date))
        .map(|l| l.loan_amount)
        .sum()
}

/// Value on `as_of` compared with the end of the preceding `months` period.
pub fn portfolio_value(
    snapshot: &PortfolioSnapshot,
    as_of: Date,
    months: u32,
) -> PortfolioResult<PortfolioValue> {
    let previous = Period::trailing_months(as_of, months)?.preceding()?;

    let current_value = outstanding_on(snapshot, as_of);
    let previous_value = outstanding_on(snapshot, previous.end());
    let change_amount = current_value - previous_value;
    let change_percentage = percentage_change(
        current_value.to_f64().unwrap_or(0.0),
        previous_value.to_f64().unwrap_or(0.0),
    );

    Ok(PortfolioValue {
        current_value,
        previous_value,
        change_percentage,
        change_amount,
    })
}

/// Month-end values over the trailing `months` and the period before it.
pub fn portfolio_trends(
    snapshot: &PortfolioSnapshot,
    as_of: Date,
    months: u32,
) -> PortfolioResult<PortfolioTrends> {
    let current = Period::trailing_months(as_of, months)?;
    let previous = current.preceding()?;

    let sample = |period: &Period| -> Vec<f64> {
        period
            .month_ends()
            .into_iter()
            .map(|d| outstanding_on(snapshot, d).to_f64().unwrap_or(0.0))
            .collect()
    };

    let current_period = sample(&current);
    let mut previous_period = sample(&previous);
    let fill = previous_period.last().copied().unwrap_or(0.0);
    previous_period.resize(current_period.len(), fill);

    Ok(PortfolioTrends {
        months: current.month_labels(),
        current_period,
        previous_period,
    })
}
