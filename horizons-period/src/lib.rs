//! # horizons-period
//!
//! Pure period key calculus for the horizons planner.
//!
//! A *period key* names one instance of a cadence (a day, an ISO week, a
//! month, a quarter, a half-year or a year) in a user's local calendar.
//! Keys of one horizon are fixed-width, so they sort lexically in
//! chronological order.
//!
//! This crate does no I/O and holds no state. Every function is
//! deterministic given its inputs; the only fallible inputs are horizon
//! tokens, key strings and time-zone identifiers.

pub mod error;
pub mod horizon;
pub mod key;
pub mod zone;

pub use error::{PeriodError, Result};
pub use horizon::Horizon;
pub use key::{
    Direction, current_period_key, next_period_key, period_end_exclusive, period_key_for_date,
    period_start, period_start_at, previous_period_key, shift_period_key, validate_period_key,
};
pub use zone::{local_date, local_to_utc, parse_timezone, resolve_local, start_of_day};

/// Re-exported so callers can name zones without depending on `chrono-tz`.
pub use chrono_tz::Tz;
