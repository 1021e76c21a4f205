//! age.rs
//!
//! Completed years/months between two calendar dates, in the format:
//!     "X years, Y months"            (month precision)
//!     "X years, Y months (Z Days)"   (with the total day count)
//!
//! Chrono does not provide a built-in year/month diff, so the borrowing rules
//! are implemented manually:
//!   • month underflow (borrowing from years)
//!   • day-of-month shortfall (the current month is not yet completed)
//!   • leap years and varying month lengths are handled by `NaiveDate`
//!
//! The day count is independent of the year/month split: it is the number of
//! elapsed calendar days between the two dates.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDateError {
    #[error("invalid calendar date {year:04}-{month:02}-{day:02}")]
    OutOfRange { year: i32, month: u32, day: u32 },

    #[error("cannot parse '{0}' as a YYYY-MM-DD date")]
    Unparseable(String),

    #[error("birth date {birth} is after reference date {reference}")]
    BirthAfterReference {
        birth: CalendarDate,
        reference: CalendarDate,
    },
}

/// A valid proleptic Gregorian date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, InvalidDateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or(InvalidDateError::OutOfRange { year, month, day })
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// Day-first rendering used in the JSON payload, e.g. `03-11-2025`.
    pub fn to_dmy(self) -> String {
        self.0.format("%d-%m-%Y").to_string()
    }

    /// Whole days from `earlier` to `self`; negative if `earlier` is later.
    pub fn days_since(self, earlier: CalendarDate) -> i64 {
        (self.0 - earlier.0).num_days()
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl FromStr for CalendarDate {
    type Err = InvalidDateError;

    /// Strict `YYYY-MM-DD`: four-digit year, two-digit month and day.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparseable = || InvalidDateError::Unparseable(s.to_string());

        let bytes = s.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shape_ok {
            return Err(unparseable());
        }

        let year = s[0..4].parse().map_err(|_| unparseable())?;
        let month = s[5..7].parse().map_err(|_| unparseable())?;
        let day = s[8..10].parse().map_err(|_| unparseable())?;
        Self::new(year, month, day)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeBreakdown {
    pub years: u32,
    pub months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u64>,
    pub formatted: String,
}

/// Completed years and months from `birth` to `reference`.
pub fn compute_age(
    birth: CalendarDate,
    reference: CalendarDate,
) -> Result<AgeBreakdown, InvalidDateError> {
    breakdown(birth, reference, false)
}

/// Same as [`compute_age`], with the total elapsed day count filled in.
pub fn compute_age_with_days(
    birth: CalendarDate,
    reference: CalendarDate,
) -> Result<AgeBreakdown, InvalidDateError> {
    breakdown(birth, reference, true)
}

fn breakdown(
    birth: CalendarDate,
    reference: CalendarDate,
    with_days: bool,
) -> Result<AgeBreakdown, InvalidDateError> {
    if birth > reference {
        return Err(InvalidDateError::BirthAfterReference { birth, reference });
    }

    let day_short = reference.day() < birth.day();

    let mut years = reference.year() - birth.year();
    let mut months = reference.month() as i32 - birth.month() as i32;

    // Fix month underflow
    if months < 0 || (months == 0 && day_short) {
        years -= 1;
        months += 12;
    }

    // The current month only counts once its day-of-month has been reached
    if day_short {
        months -= 1;
        if months < 0 {
            years -= 1;
            months = 11;
        }
    }

    // birth <= reference keeps both components non-negative
    let years = years as u32;
    let months = months as u32;

    let days = with_days.then(|| reference.days_since(birth) as u64);

    let mut formatted = format!("{years} years, {months} months");
    if let Some(d) = days {
        formatted.push_str(&format!(" ({d} Days)"));
    }

    Ok(AgeBreakdown {
        years,
        months,
        days,
        formatted,
    })
}
