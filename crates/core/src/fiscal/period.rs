//! Reporting period types.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named date interval that a report column is computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Key unique within one report run (e.g. "mar_2024").
    pub key: String,
    /// Column label (e.g. "Mar 2024").
    pub label: String,
    /// First day of the period (inclusive).
    pub from_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub to_date: NaiveDate,
}

impl Period {
    /// Creates a period whose label equals its key.
    #[must_use]
    pub fn new(key: impl Into<String>, from_date: NaiveDate, to_date: NaiveDate) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            from_date,
            to_date,
        }
    }

    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.from_date && date <= self.to_date
    }
}

/// How a date range is split into periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    /// One period per month.
    Monthly,
    /// One period per three months.
    Quarterly,
    /// One period per six months.
    HalfYearly,
    /// One period per twelve months.
    Yearly,
}

impl Periodicity {
    /// Number of months covered by one period.
    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::HalfYearly => 6,
            Self::Yearly => 12,
        }
    }
}

/// Errors raised while generating periods.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    /// Invalid date range.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Date arithmetic left the supported calendar range.
    #[error("Date out of range after {0}")]
    DateOutOfRange(NaiveDate),
}

/// Splits `[from, to]` into contiguous, non-overlapping periods.
///
/// The final period is clipped to `to`, so a range that does not divide
/// evenly ends with a shorter period.
///
/// # Errors
///
/// Returns an error if `from` is after `to`.
pub fn generate_periods(
    from: NaiveDate,
    to: NaiveDate,
    periodicity: Periodicity,
) -> Result<Vec<Period>, PeriodError> {
    if from > to {
        return Err(PeriodError::InvalidDateRange {
            start: from,
            end: to,
        });
    }

    let step = Months::new(periodicity.months());
    let mut periods = Vec::new();
    let mut start = from;

    while start <= to {
        let next_start = start
            .checked_add_months(step)
            .ok_or(PeriodError::DateOutOfRange(start))?;
        let end = next_start
            .checked_sub_days(Days::new(1))
            .ok_or(PeriodError::DateOutOfRange(next_start))?
            .min(to);

        periods.push(Period {
            key: end.format("%b_%Y").to_string().to_lowercase(),
            label: end.format("%b %Y").to_string(),
            from_date: start,
            to_date: end,
        });

        start = next_start;
    }

    Ok(periods)
}
