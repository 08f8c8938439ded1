//! Interval planning for date-partitioned fetches
//!
//! Splits a `[from_date, to_date]` range into consecutive fetch intervals.
//! The grid granularity is picked from the span length:
//!
//! | span (days)        | granularity | grid points            |
//! |--------------------|-------------|------------------------|
//! | `> 365`            | yearly      | 1 January              |
//! | `31..=365`         | monthly     | 1st of each month      |
//! | `8..=30`           | weekly      | each Monday            |
//! | `1..=7`            | single      | none                   |
//! | `0`                | none        | zero intervals         |
//!
//! The first boundary is always `from_date` and the last is always `to_date`.
//! Grid points strictly between the two are inserted in order.
//!
//! Grid points are period starts. Tools that anchor on period ends (pandas
//! `date_range` with `freq="Y"`, `"M"` or `"W"` splits on 31 December,
//! month-end and Sunday) cut different intervals, so raw file names will not
//! match theirs.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Spans strictly longer than this many days are split yearly.
pub const YEARLY_THRESHOLD_DAYS: i64 = 365;

/// Spans strictly longer than this many days (and up to the yearly threshold) are split monthly.
pub const MONTHLY_THRESHOLD_DAYS: i64 = 30;

/// Spans strictly longer than this many days (and up to the monthly threshold) are split weekly.
pub const WEEKLY_THRESHOLD_DAYS: i64 = 7;

/// A contiguous date sub-range fetched as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    /// First day of the interval
    pub start: NaiveDate,
    /// Boundary shared with the next interval (or the requested end date)
    pub end: NaiveDate,
}

impl DateInterval {
    /// Number of days between start and end
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl std::fmt::Display for DateInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Grid granularity chosen for a date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One interval covering the whole range
    Single,
    /// Split on Mondays
    Weekly,
    /// Split on the first day of each month
    Monthly,
    /// Split on the first day of each year
    Yearly,
}

impl Granularity {
    /// Pick the granularity for a span measured in days
    pub fn for_span(days: i64) -> Self {
        if days > YEARLY_THRESHOLD_DAYS {
            Granularity::Yearly
        } else if days > MONTHLY_THRESHOLD_DAYS {
            Granularity::Monthly
        } else if days > WEEKLY_THRESHOLD_DAYS {
            Granularity::Weekly
        } else {
            Granularity::Single
        }
    }

    /// First grid point strictly after `date`, if representable
    fn next_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Single => None,
            Granularity::Weekly => {
                let offset = 7 - u64::from(date.weekday().num_days_from_monday());
                date.checked_add_days(Days::new(offset))
            }
            Granularity::Monthly => date
                .with_day(1)
                .and_then(|first| first.checked_add_months(Months::new(1))),
            Granularity::Yearly => NaiveDate::from_ymd_opt(date.year() + 1, 1, 1),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Granularity::Single => "single",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        };
        f.write_str(name)
    }
}

/// Planner errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// `from_date` is after `to_date`
    #[error("inverted date range: {from} is after {to}")]
    InvertedRange {
        /// Requested start
        from: NaiveDate,
        /// Requested end
        to: NaiveDate,
    },
}

/// Compute the ordered boundary dates for `[from, to]`.
///
/// Returns `[from]` when `from == to`, which yields zero intervals.
pub fn plan_boundaries(from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>, PlanError> {
    if from > to {
        return Err(PlanError::InvertedRange { from, to });
    }

    let mut boundaries = vec![from];
    if from == to {
        return Ok(boundaries);
    }

    let granularity = Granularity::for_span((to - from).num_days());
    let mut cursor = from;
    while let Some(next) = granularity.next_after(cursor) {
        if next >= to {
            break;
        }
        boundaries.push(next);
        cursor = next;
    }

    // The grid stops short of `to`, so the end is appended once
    if boundaries.last() != Some(&to) {
        boundaries.push(to);
    }

    tracing::debug!(
        %from,
        %to,
        %granularity,
        boundaries = boundaries.len(),
        "Planned interval boundaries"
    );

    Ok(boundaries)
}

/// Compute the fetch intervals for `[from, to]` as consecutive boundary pairs
pub fn plan_intervals(from: NaiveDate, to: NaiveDate) -> Result<Vec<DateInterval>, PlanError> {
    let boundaries = plan_boundaries(from, to)?;
    Ok(boundaries
        .windows(2)
        .map(|pair| DateInterval {
            start: pair[0],
            end: pair[1],
        })
        .collect())
}
