//! Civil-date arithmetic for time-to-expiry.
//!
//! Quote and expiry dates arrive as `MM/DD/YYYY` strings. They are turned into
//! signed day counts since 1970-01-01 with an exact proleptic Gregorian
//! algorithm (era / year-of-era / day-of-year decomposition), so no calendar
//! library or timezone is involved in the batch path.

use std::fmt;

use crate::error::{BatchError, BatchResult};

/// Days in a 400-year Gregorian era.
const DAYS_PER_ERA: i64 = 146_097;

/// Offset from 0000-03-01 to 1970-01-01.
const EPOCH_OFFSET: i64 = 719_468;

/// Largest accepted year magnitude. Day counts stay within half of `i64`, so
/// the difference of any two of them fits too.
pub const MAX_YEAR: i64 = i64::MAX / 732;

/// Days since 1970-01-01 for a proleptic Gregorian date.
///
/// Negative results are dates before the epoch. Ranges are not checked:
/// `month` must be in `1..=12` and `day` in `1..=days_in_month(year, month)`,
/// anything else yields an unspecified count.
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    // Years start in March so the leap day is the last day of the year.
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = (y - era * 400) as u32; // [0, 399]
    let mp = if month > 2 { month - 3 } else { month + 9 }; // [0, 11]
    let doy = (153 * mp + 2) / 5 + day - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
    era * DAYS_PER_ERA + i64::from(doe) - EPOCH_OFFSET
}

pub fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// A calendar date with no time or timezone component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CivilDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
}

impl CivilDate {
    /// Build a date, rejecting months and days that do not exist and years
    /// beyond [`MAX_YEAR`].
    pub fn new(year: i64, month: u32, day: u32) -> BatchResult<Self> {
        if !(-MAX_YEAR..=MAX_YEAR).contains(&year) {
            return Err(BatchError::parse(format!("year {} out of range", year)));
        }
        if !(1..=12).contains(&month) {
            return Err(BatchError::parse(format!(
                "month {} out of range in {:04}-{:02}-{:02}",
                month, year, month, day
            )));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(BatchError::parse(format!(
                "day {} out of range in {:04}-{:02}-{:02}",
                day, year, month, day
            )));
        }
        Ok(Self { year, month, day })
    }

    /// Parse a `MM/DD/YYYY` string.
    pub fn parse(s: &str) -> BatchResult<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() != 3 {
            return Err(BatchError::parse(format!(
                "invalid date [{}], expected MM/DD/YYYY",
                s
            )));
        }

        let month = parse_component::<u32>(parts[0], s)?;
        let day = parse_component::<u32>(parts[1], s)?;
        let year = parse_component::<i64>(parts[2], s)?;

        Self::new(year, month, day)
    }

    /// Signed day count since 1970-01-01.
    pub fn days_since_epoch(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day)
    }
}

impl fmt::Display for CivilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.month, self.day, self.year)
    }
}

fn parse_component<T: std::str::FromStr>(part: &str, whole: &str) -> BatchResult<T> {
    part.trim()
        .parse::<T>()
        .map_err(|_| BatchError::parse(format!("invalid date [{}], expected MM/DD/YYYY", whole)))
}

/// Days from `start` to `end`; negative when `end` comes first.
pub fn days_between(start: &CivilDate, end: &CivilDate) -> i64 {
    end.days_since_epoch() - start.days_since_epoch()
}

/// Days between two `MM/DD/YYYY` strings.
pub fn date_diff_days(start: &str, end: &str) -> BatchResult<i64> {
    let start = CivilDate::parse(start)?;
    let end = CivilDate::parse(end)?;
    Ok(days_between(&start, &end))
}

/// Convert a day count to a year fraction on the given basis (e.g. 365).
pub fn time_to_expiry_years(days: i64, basis: f64) -> f64 {
    days as f64 / basis
}
