//! Shared traits, money helpers, and time utilities for bookkeeping primitives.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum drift tolerated between total debits and total credits.
pub const BALANCE_TOLERANCE: f64 = 0.001;

/// Maximum drift tolerated when reconciling payment allocations.
pub const ALLOCATION_TOLERANCE: f64 = 0.01;

/// Exposes a stable identifier for entities stored in the company book.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Rounds a monetary value to cents.
pub fn round_money(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Returns true when two amounts are equal within `tolerance`.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Enumerates time units used by `TimeInterval`.
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeUnit::Day => "Day",
            TimeUnit::Week => "Week",
            TimeUnit::Month => "Month",
            TimeUnit::Year => "Year",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Represents a time unit and multiplier for recurring schedules.
pub struct TimeInterval {
    pub every: u32,
    pub unit: TimeUnit,
}

impl TimeInterval {
    pub fn monthly() -> Self {
        Self {
            every: 1,
            unit: TimeUnit::Month,
        }
    }

    /// Calculates the next date after `from` according to the interval.
    ///
    /// Month and year steps clamp to the last day of the target month.
    pub fn next_date(&self, from: NaiveDate) -> NaiveDate {
        let every = self.every.max(1);
        match self.unit {
            TimeUnit::Day => from + Duration::days(every as i64),
            TimeUnit::Week => from + Duration::weeks(every as i64),
            TimeUnit::Month => shift_month(from, every as i32),
            TimeUnit::Year => shift_month(from, every as i32 * 12),
        }
    }

    /// Returns the date reached after `steps` intervals from `anchor`.
    ///
    /// Month-based steps are measured from the anchor each time so a Jan 31 series
    /// lands on Feb 28 and then Mar 31, rather than drifting to the 28th.
    pub fn nth_date(&self, anchor: NaiveDate, steps: u32) -> NaiveDate {
        let every = self.every.max(1);
        match self.unit {
            TimeUnit::Day => anchor + Duration::days((every * steps) as i64),
            TimeUnit::Week => anchor + Duration::weeks((every * steps) as i64),
            TimeUnit::Month => shift_month(anchor, (every * steps) as i32),
            TimeUnit::Year => shift_month(anchor, (every * steps * 12) as i32),
        }
    }

    pub fn label(&self) -> String {
        match (self.every, self.unit) {
            (1, TimeUnit::Day) => "Daily".into(),
            (1, TimeUnit::Week) => "Weekly".into(),
            (1, TimeUnit::Month) => "Monthly".into(),
            (1, TimeUnit::Year) => "Yearly".into(),
            (n, unit) => format!("Every {} {}{}", n, unit, if n > 1 { "s" } else { "" }),
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 + months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
