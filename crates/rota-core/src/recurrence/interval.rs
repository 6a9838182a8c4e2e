use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Base unit of a plan's period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl PeriodUnit {
    pub const ALL: [PeriodUnit; 6] = [
        PeriodUnit::Minute,
        PeriodUnit::Hour,
        PeriodUnit::Day,
        PeriodUnit::Week,
        PeriodUnit::Month,
        PeriodUnit::Year,
    ];

    /// Canonical storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodUnit::Minute => "minute",
            PeriodUnit::Hour => "hour",
            PeriodUnit::Day => "day",
            PeriodUnit::Week => "week",
            PeriodUnit::Month => "month",
            PeriodUnit::Year => "year",
        }
    }
}

impl std::fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodUnit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min" | "minute" | "minutes" => Ok(PeriodUnit::Minute),
            "hour" | "hours" => Ok(PeriodUnit::Hour),
            "day" | "days" => Ok(PeriodUnit::Day),
            "week" | "weeks" => Ok(PeriodUnit::Week),
            "month" | "months" => Ok(PeriodUnit::Month),
            "year" | "years" => Ok(PeriodUnit::Year),
            _ => Err(CoreError::InvalidPeriod(format!("unknown period unit '{}'", s))),
        }
    }
}

/// One step of a plan: either a fixed duration or a calendar month count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Fixed(Duration),
    Calendar { months: u32 },
}

impl Interval {
    /// Applies one step to `from`; `None` when the result leaves chrono's range.
    ///
    /// Calendar steps clamp to the last valid day of the target month.
    #[inline]
    pub fn add_to(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Interval::Fixed(duration) => from.checked_add_signed(*duration),
            Interval::Calendar { months } => from.checked_add_months(Months::new(*months)),
        }
    }

    /// The interval scaled by `n`. For calendar steps the month count is
    /// multiplied, so clamping happens once on the final target.
    pub fn times(&self, n: u32) -> Option<Interval> {
        match self {
            Interval::Fixed(duration) => {
                let n = i32::try_from(n).ok()?;
                duration.checked_mul(n).map(Interval::Fixed)
            }
            Interval::Calendar { months } => months
                .checked_mul(n)
                .map(|months| Interval::Calendar { months }),
        }
    }
}

/// Maps a period unit and multiplier to a calendar-aware interval.
pub fn compute_interval(unit: PeriodUnit, multiplier: i64) -> Result<Interval, CoreError> {
    if multiplier <= 0 {
        return Err(CoreError::InvalidPeriod(format!(
            "period multiplier must be positive, got {}",
            multiplier
        )));
    }

    let out_of_range = || {
        CoreError::InvalidPeriod(format!("{} x {} is out of range", multiplier, unit))
    };

    let interval = match unit {
        PeriodUnit::Minute => Interval::Fixed(Duration::try_minutes(multiplier).ok_or_else(out_of_range)?),
        PeriodUnit::Hour => Interval::Fixed(Duration::try_hours(multiplier).ok_or_else(out_of_range)?),
        PeriodUnit::Day => Interval::Fixed(Duration::try_days(multiplier).ok_or_else(out_of_range)?),
        PeriodUnit::Week => Interval::Fixed(Duration::try_weeks(multiplier).ok_or_else(out_of_range)?),
        PeriodUnit::Month => {
            let months = u32::try_from(multiplier).map_err(|_| out_of_range())?;
            Interval::Calendar { months }
        }
        PeriodUnit::Year => {
            let months = u32::try_from(multiplier)
                .ok()
                .and_then(|years| years.checked_mul(12))
                .ok_or_else(out_of_range)?;
            Interval::Calendar { months }
        }
    };

    Ok(interval)
}
