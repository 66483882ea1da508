//! Time-zone helpers built on `chrono-tz`.
//!
//! Local wall-clock times do not map one-to-one onto instants: around DST
//! transitions a local time can be ambiguous (fall back) or missing (spring
//! forward). [`resolve_local`] picks one instant for every local time.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{PeriodError, Result};

/// Parse an IANA time-zone identifier such as `"America/Los_Angeles"`.
///
/// # Errors
///
/// Returns [`PeriodError::InvalidTimezone`] for unknown identifiers.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| PeriodError::InvalidTimezone(name.to_owned()))
}

/// The local calendar date of `now_utc` in `tz`.
#[must_use]
pub fn local_date(tz: Tz, now_utc: DateTime<Utc>) -> NaiveDate {
    now_utc.with_timezone(&tz).date_naive()
}

/// Map a local wall-clock time to an instant in `tz`.
///
/// Ambiguous times resolve to the earlier instant. Times that fall inside a
/// DST gap are read with the offset in force before the gap, which moves
/// them forward by the gap length (02:30 on a spring-forward night becomes
/// 03:30).
#[must_use]
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => {
            let probe = local - Duration::days(1);
            let offset = tz.offset_from_utc_datetime(&probe).fix();
            let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
            tz.from_utc_datetime(&utc)
        }
    }
}

/// Local midnight of `date` in `tz`.
#[must_use]
pub fn start_of_day(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    resolve_local(tz, date.and_time(NaiveTime::MIN))
}

/// Combine a local date and time of day in `tz` into a UTC instant.
#[must_use]
pub fn local_to_utc(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    resolve_local(tz, date.and_time(time)).with_timezone(&Utc)
}
