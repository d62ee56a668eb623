//! Calendar date type used for measurement and prediction dates.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::{CoreError, CoreResult};

/// A calendar date without time zone.
///
/// Wraps `chrono::NaiveDate` and serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a new date from year, month, and day.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDate` if the date is invalid.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> CoreResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or_else(|| CoreError::invalid_date(format!("{year}-{month:02}-{day:02}")))
    }

    /// Parses a date from a `YYYY-MM-DD` string.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDate` if the string cannot be parsed.
    pub fn parse(s: &str) -> CoreResult<Self> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Date)
            .map_err(|e| CoreError::invalid_date(format!("'{s}': {e}")))
    }

    /// Returns today's date in UTC.
    #[must_use]
    pub fn today() -> Self {
        Date(Utc::now().date_naive())
    }

    /// Returns the year component.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the month component (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the day component (1-31).
    #[must_use]
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Adds a number of days (negative values move backwards).
    ///
    /// Saturates at the representable date range.
    #[must_use]
    pub fn add_days(&self, days: i64) -> Self {
        self.checked_add_days(days).unwrap_or(if days < 0 {
            Date(NaiveDate::MIN)
        } else {
            Date(NaiveDate::MAX)
        })
    }

    /// Adds a number of days, failing when the result is out of range.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDate` if the result is out of range.
    pub fn checked_add_days(&self, days: i64) -> CoreResult<Self> {
        chrono::TimeDelta::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Date)
            .ok_or_else(|| CoreError::invalid_date(format!("{self} + {days} days is out of range")))
    }

    /// Adds months, rolling back to the last valid day when needed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDate` if the result is out of range.
    pub fn add_months(&self, months: i32) -> CoreResult<Self> {
        let total = self.year() * 12 + self.month() as i32 - 1 + months;
        let year = total.div_euclid(12);
        let month = total.rem_euclid(12) as u32 + 1;
        let day = self.day().min(days_in_month(year, month));
        Self::from_ymd(year, month, day)
    }

    /// Number of calendar days from `self` to `other`.
    #[must_use]
    pub fn days_between(&self, other: &Date) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// First day of this date's month.
    #[must_use]
    pub fn start_of_month(&self) -> Self {
        Date(self.0.with_day(1).unwrap_or(self.0))
    }

    /// Last day of this date's month.
    #[must_use]
    pub fn end_of_month(&self) -> Self {
        let last = days_in_month(self.year(), self.month());
        Date(self.0.with_day(last).unwrap_or(self.0))
    }

    /// Months elapsed from `other`'s month to this date's month.
    #[must_use]
    pub fn months_since(&self, other: &Date) -> i32 {
        (self.year() - other.year()) * 12 + self.month() as i32 - other.month() as i32
    }

    /// Short English month label ("Jan" .. "Dec").
    #[must_use]
    pub fn month_label(&self) -> String {
        self.0.format("%b").to_string()
    }

    /// Returns the underlying `NaiveDate`.
    #[must_use]
    pub fn as_naive_date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl std::str::FromStr for Date {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date(date)
    }
}

impl From<Date> for NaiveDate {
    fn from(date: Date) -> Self {
        date.0
    }
}

impl Add<i64> for Date {
    type Output = Self;

    fn add(self, days: i64) -> Self::Output {
        self.add_days(days)
    }
}

impl Sub<i64> for Date {
    type Output = Self;

    fn sub(self, days: i64) -> Self::Output {
        self.add_days(-days)
    }
}

impl Sub<Date> for Date {
    type Output = i64;

    /// Returns the number of days between two dates.
    fn sub(self, other: Date) -> Self::Output {
        other.days_between(&self)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    }
}
