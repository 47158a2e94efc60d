use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{cmp, fmt};
use thiserror::Error;

// These are tedious arrays to aid the lookup of month lengths. Unfortunately the
// `chrono` library does not give us helpers for this.
const MONTH_LENGTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const MONTH_LENGTHS_LEAP: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum CalendarError {
    #[error("the range {0} - {1} ends before it starts")]
    InvalidRange(NaiveDate, NaiveDate), // start, end
    #[error("month {0} is not between 1 and 12")]
    InvalidMonth(u32),
    #[error("{0}-{1:02}-{2:02} is not a representable date")]
    InvalidDate(i32, u32, u32), // year, month, day
}

/// An inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, CalendarError> {
        if to < from {
            return Err(CalendarError::InvalidRange(from, to));
        }

        Ok(DateRange { from, to })
    }

    /// Number of days in the range, counting both ends
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Returns the days shared by both ranges, if there are any
    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let from = cmp::max(self.from, other.from);
        let to = cmp::min(self.to, other.to);

        if from <= to {
            Some(DateRange { from, to })
        } else {
            None
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.from, self.to)
    }
}

/// Number of calendar days from `start` to `end`, including both days.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> Result<i64, CalendarError> {
    DateRange::new(start, end).map(|r| r.days())
}

/// Proleptic Gregorian leap year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }

    let index = (month - 1) as usize;
    Ok(if is_leap_year(year) {
        MONTH_LENGTHS_LEAP[index]
    } else {
        MONTH_LENGTHS[index]
    })
}

/// The first and last day of a calendar month
pub fn month_bounds(year: i32, month: u32) -> Result<DateRange, CalendarError> {
    let length = days_in_month(year, month)?;

    Ok(DateRange {
        from: ymd(year, month, 1)?,
        to: ymd(year, month, length)?,
    })
}

/// The first and last day of a calendar year
pub fn year_bounds(year: i32) -> Result<DateRange, CalendarError> {
    Ok(DateRange {
        from: ymd(year, 1, 1)?,
        to: ymd(year, 12, 31)?,
    })
}

/// Counts the days a period shares with a month. Both ranges are closed, so a period
/// that merely touches the month on its first or last day still overlaps by one day.
pub fn overlap_days(
    period_start: NaiveDate,
    period_end: NaiveDate,
    month_start: NaiveDate,
    month_end: NaiveDate,
) -> i64 {
    let start = cmp::max(period_start, month_start);
    let end = cmp::min(period_end, month_end);

    // Note we add a day here as we are calculating length, not difference
    cmp::max(0, (end - start + Duration::days(1)).num_days())
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(CalendarError::InvalidDate(year, month, day))
}

#[cfg(test)]
pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
