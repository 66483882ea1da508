//! Period key formatting, parsing and shifting.
//!
//! | Horizon | Format | Example |
//! |---------|--------|---------|
//! | `DAILY` | `YYYY-MM-DD` | `2026-02-21` |
//! | `WEEKLY` | `YYYY-Www` (ISO week-year) | `2026-W08` |
//! | `MONTHLY` | `YYYY-MM` | `2026-02` |
//! | `QUARTERLY` | `YYYY-Qn` | `2026-Q1` |
//! | `HALF_YEARLY` | `YYYY-Hn` | `2026-H2` |
//! | `YEARLY` | `YYYY` | `2026` |
//!
//! Periods are anchored at their first day, so shifting never has to deal
//! with month-end clamping: a period start is always the 1st of a month or
//! an ISO Monday.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{PeriodError, Result};
use crate::horizon::Horizon;
use crate::zone;

/// Oldest and newest years a key can carry (keys use four-digit years).
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Which way to move along a horizon's sequence of periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// The key of the period containing `now_utc`, read in `tz`.
#[must_use]
pub fn current_period_key(horizon: Horizon, tz: Tz, now_utc: DateTime<Utc>) -> String {
    period_key_for_date(horizon, zone::local_date(tz, now_utc))
}

/// The key of the period containing the local calendar day `date`.
#[must_use]
pub fn period_key_for_date(horizon: Horizon, date: NaiveDate) -> String {
    match horizon {
        Horizon::Daily => date.format("%Y-%m-%d").to_string(),
        Horizon::Weekly => {
            let week = date.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        Horizon::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
        Horizon::Quarterly => format!("{:04}-Q{}", date.year(), (date.month() - 1) / 3 + 1),
        Horizon::HalfYearly => {
            let half = if date.month() <= 6 { 1 } else { 2 };
            format!("{:04}-H{half}", date.year())
        }
        Horizon::Yearly => format!("{:04}", date.year()),
    }
}

/// The first local calendar day of the period named by `key`.
///
/// # Errors
///
/// Returns [`PeriodError::InvalidPeriodKey`] if `key` does not have the
/// horizon's shape or names a day or ISO week that does not exist.
pub fn period_start(horizon: Horizon, key: &str) -> Result<NaiveDate> {
    let invalid = || PeriodError::invalid_key(horizon, key);
    let (year, rest) = split_year(key).ok_or_else(invalid)?;

    let start = match horizon {
        Horizon::Yearly => rest.is_empty().then(|| first_of_month(year, 1)).flatten(),
        Horizon::Daily => {
            let (month, day) = rest
                .strip_prefix('-')
                .and_then(|r| r.split_once('-'))
                .ok_or_else(invalid)?;
            let month = two_digits(month).ok_or_else(invalid)?;
            let day = two_digits(day).ok_or_else(invalid)?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        Horizon::Weekly => {
            let week = rest.strip_prefix("-W").and_then(two_digits).ok_or_else(invalid)?;
            NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
        }
        Horizon::Monthly => {
            let month = rest.strip_prefix('-').and_then(two_digits).ok_or_else(invalid)?;
            first_of_month(year, month)
        }
        Horizon::Quarterly => match rest.strip_prefix("-Q").and_then(one_digit) {
            Some(q @ 1..=4) => first_of_month(year, (q - 1) * 3 + 1),
            _ => None,
        },
        Horizon::HalfYearly => match rest.strip_prefix("-H").and_then(one_digit) {
            Some(1) => first_of_month(year, 1),
            Some(2) => first_of_month(year, 7),
            _ => None,
        },
    };

    start.ok_or_else(invalid)
}

/// Local midnight, in `tz`, of the first day of the period named by `key`.
///
/// # Errors
///
/// Same as [`period_start`].
pub fn period_start_at(horizon: Horizon, key: &str, tz: Tz) -> Result<DateTime<Tz>> {
    period_start(horizon, key).map(|date| zone::start_of_day(tz, date))
}

/// The first local calendar day after the period named by `key`.
///
/// # Errors
///
/// Same as [`shift_period_key`].
pub fn period_end_exclusive(horizon: Horizon, key: &str) -> Result<NaiveDate> {
    let start = period_start(horizon, key)?;
    step(horizon, start, Direction::Forward).ok_or_else(|| out_of_range(horizon, key))
}

/// The key one period before or after `key`, using the horizon's calendar
/// length (1 day, 1 week, 1/3/6 months or 1 year).
///
/// # Errors
///
/// Returns [`PeriodError::InvalidPeriodKey`] for malformed keys and
/// [`PeriodError::OutOfRange`] when the result would leave years
/// 0001..=9999.
pub fn shift_period_key(horizon: Horizon, key: &str, direction: Direction) -> Result<String> {
    let start = period_start(horizon, key)?;
    let shifted = step(horizon, start, direction)
        .filter(|d| (MIN_YEAR..=MAX_YEAR).contains(&key_year(horizon, *d)))
        .ok_or_else(|| out_of_range(horizon, key))?;
    Ok(period_key_for_date(horizon, shifted))
}

/// Shorthand for [`shift_period_key`] with [`Direction::Forward`].
///
/// # Errors
///
/// Same as [`shift_period_key`].
pub fn next_period_key(horizon: Horizon, key: &str) -> Result<String> {
    shift_period_key(horizon, key, Direction::Forward)
}

/// Shorthand for [`shift_period_key`] with [`Direction::Backward`].
///
/// # Errors
///
/// Same as [`shift_period_key`].
pub fn previous_period_key(horizon: Horizon, key: &str) -> Result<String> {
    shift_period_key(horizon, key, Direction::Backward)
}

/// Check that `key` is well-formed under `horizon`.
///
/// # Errors
///
/// Same as [`period_start`].
pub fn validate_period_key(horizon: Horizon, key: &str) -> Result<()> {
    period_start(horizon, key).map(|_| ())
}

fn step(horizon: Horizon, start: NaiveDate, direction: Direction) -> Option<NaiveDate> {
    match (horizon.months_per_period(), direction) {
        (Some(months), Direction::Forward) => start.checked_add_months(Months::new(months)),
        (Some(months), Direction::Backward) => start.checked_sub_months(Months::new(months)),
        (None, direction) => {
            let days = Days::new(if horizon == Horizon::Weekly { 7 } else { 1 });
            match direction {
                Direction::Forward => start.checked_add_days(days),
                Direction::Backward => start.checked_sub_days(days),
            }
        }
    }
}

/// The year a key derived from `date` would carry.
fn key_year(horizon: Horizon, date: NaiveDate) -> i32 {
    if horizon == Horizon::Weekly {
        date.iso_week().year()
    } else {
        date.year()
    }
}

fn out_of_range(horizon: Horizon, key: &str) -> PeriodError {
    PeriodError::OutOfRange(format!("{horizon} {key} has no neighbour in years 0001-9999"))
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Splits a leading four-digit year off `key`.
fn split_year(key: &str) -> Option<(i32, &str)> {
    let digits = key.get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = digits.parse().ok()?;
    (year >= MIN_YEAR).then(|| (year, &key[4..]))
}

fn two_digits(s: &str) -> Option<u32> {
    (s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()))
        .then(|| s.parse().ok())
        .flatten()
}

fn one_digit(s: &str) -> Option<u32> {
    match s.as_bytes() {
        [b] if b.is_ascii_digit() => Some(u32::from(b - b'0')),
        _ => None,
    }
}
