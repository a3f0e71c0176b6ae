//! # Date Normalization
//!
//! Turns the raw text of a `time` statement into a [`CalendarPoint`] with
//! an explicit [`DatePrecision`]. Two forms are recognised, tried in order:
//!
//! 1. exactly four ASCII digits (`2010`), year precision;
//! 2. `<Month name> <day> <year>` (`January 10 2010`), day precision.
//!
//! Anything else is [`ValidationError::InvalidDateFormat`]. Time zones,
//! BCE years and month-only dates are not handled.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Granularity at which a calendar point is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    /// Only the year is known.
    Year,
    /// Year, month and day are known.
    Day,
}

impl DatePrecision {
    /// Numeric precision code used by time datavalues (9 = year, 11 = day).
    pub fn code(self) -> u8 {
        match self {
            Self::Year => 9,
            Self::Day => 11,
        }
    }
}

/// A point on the proleptic Gregorian calendar.
///
/// Month and day are either both set (day precision) or both unset
/// (year precision); the constructors enforce this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarPoint {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
}

impl CalendarPoint {
    /// A year-precision point.
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    /// A day-precision point.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: Some(date.month()),
            day: Some(date.day()),
        }
    }

    /// Year component.
    pub fn year_value(&self) -> i32 {
        self.year
    }

    /// Month component, if known.
    pub fn month(&self) -> Option<u32> {
        self.month
    }

    /// Day component, if known.
    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// Precision implied by which components are set.
    pub fn precision(&self) -> DatePrecision {
        match (self.month, self.day) {
            (Some(_), Some(_)) => DatePrecision::Day,
            _ => DatePrecision::Year,
        }
    }

    /// Timestamp in datavalue form: `+YYYY-MM-DDT00:00:00Z`, with unknown
    /// components written as `00`.
    pub fn to_timestamp(&self) -> String {
        format!(
            "+{:04}-{:02}-{:02}T00:00:00Z",
            self.year,
            self.month.unwrap_or(0),
            self.day.unwrap_or(0)
        )
    }
}

impl fmt::Display for CalendarPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.month, self.day) {
            (Some(m), Some(d)) => write!(f, "{:04}-{m:02}-{d:02}", self.year),
            _ => write!(f, "{:04}", self.year),
        }
    }
}

/// Parse a raw time value into a calendar point.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDateFormat`] carrying `raw` when no
/// recognised form matches, including well-formed text naming an
/// impossible date such as `February 30 2010`.
pub fn normalize_date(raw: &str) -> Result<CalendarPoint, ValidationError> {
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let year = raw
            .parse()
            .map_err(|_| ValidationError::InvalidDateFormat(raw.to_string()))?;
        return Ok(CalendarPoint::year(year));
    }

    if is_month_day_year(raw) {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%B %d %Y") {
            return Ok(CalendarPoint::from_date(date));
        }
    }

    Err(ValidationError::InvalidDateFormat(raw.to_string()))
}

/// Shape check for `<word> <1-2 digits> <4 digits>`; chrono alone would
/// also accept signed or short years.
fn is_month_day_year(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split(' ').collect();
    match parts.as_slice() {
        [month, day, year] => {
            !month.is_empty()
                && month.chars().all(|c| c.is_ascii_alphabetic())
                && (1..=2).contains(&day.len())
                && day.bytes().all(|b| b.is_ascii_digit())
                && year.len() == 4
                && year.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_digits_is_year_precision() {
        let point = normalize_date("2010").unwrap();
        assert_eq!(point.year_value(), 2010);
        assert_eq!(point.month(), None);
        assert_eq!(point.day(), None);
        assert_eq!(point.precision(), DatePrecision::Year);
        assert_eq!(point.to_timestamp(), "+2010-00-00T00:00:00Z");
    }

    #[test]
    fn leading_zero_year() {
        let point = normalize_date("0999").unwrap();
        assert_eq!(point.year_value(), 999);
        assert_eq!(point.to_string(), "0999");
    }

    #[test]
    fn month_day_year_is_day_precision() {
        let point = normalize_date("January 10 2010").unwrap();
        assert_eq!(point.year_value(), 2010);
        assert_eq!(point.month(), Some(1));
        assert_eq!(point.day(), Some(10));
        assert_eq!(point.precision(), DatePrecision::Day);
        assert_eq!(point.to_timestamp(), "+2010-01-10T00:00:00Z");
        assert_eq!(point.to_string(), "2010-01-10");
    }

    #[test]
    fn single_digit_day() {
        let point = normalize_date("March 5 1999").unwrap();
        assert_eq!(point.month(), Some(3));
        assert_eq!(point.day(), Some(5));
    }

    #[test]
    fn impossible_date_is_rejected() {
        assert_eq!(
            normalize_date("February 30 2010"),
            Err(ValidationError::InvalidDateFormat("February 30 2010".to_string()))
        );
    }

    #[test]
    fn other_forms_are_rejected() {
        for raw in [
            "not-a-date",
            "",
            "201",
            "20100",
            " 2010",
            "2010-01-10",
            "10 January 2010",
            "January 2010",
            "January 10 10",
            "January 10 +2010",
            "Smarch 10 2010",
        ] {
            assert_eq!(
                normalize_date(raw),
                Err(ValidationError::InvalidDateFormat(raw.to_string())),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn precision_codes() {
        assert_eq!(DatePrecision::Year.code(), 9);
        assert_eq!(DatePrecision::Day.code(), 11);
    }
}
