//! Error types for the horizons-period crate.
//!
//! Every error here is a caller or data error: none of them are retryable.

use crate::horizon::Horizon;

/// Errors that can occur while computing or parsing period keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    /// The horizon token is not one of the six known cadences.
    #[error("invalid horizon: {0}")]
    InvalidHorizon(String),

    /// The key does not have the shape the horizon expects, or names a
    /// date/week that does not exist.
    #[error("invalid {horizon} period key: {key}")]
    InvalidPeriodKey {
        /// Horizon the key was parsed under.
        horizon: Horizon,
        /// The offending key.
        key: String,
    },

    /// The time-zone identifier is not a known IANA zone.
    #[error("invalid time zone: {0}")]
    InvalidTimezone(String),

    /// Calendar arithmetic left the four-digit-year range.
    #[error("period out of range: {0}")]
    OutOfRange(String),
}

impl PeriodError {
    pub(crate) fn invalid_key(horizon: Horizon, key: &str) -> Self {
        Self::InvalidPeriodKey {
            horizon,
            key: key.to_owned(),
        }
    }
}

/// Convenience type alias for horizons-period results.
pub type Result<T> = std::result::Result<T, PeriodError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_horizon() {
        let err = PeriodError::InvalidHorizon("HOURLY".into());
        assert_eq!(err.to_string(), "invalid horizon: HOURLY");
    }

    #[test]
    fn display_invalid_period_key_names_horizon() {
        let err = PeriodError::invalid_key(Horizon::Weekly, "2026-W99");
        assert_eq!(err.to_string(), "invalid WEEKLY period key: 2026-W99");
    }

    #[test]
    fn display_invalid_timezone() {
        let err = PeriodError::InvalidTimezone("Mars/Olympus".into());
        assert_eq!(err.to_string(), "invalid time zone: Mars/Olympus");
    }

    #[test]
    fn display_out_of_range() {
        let err = PeriodError::OutOfRange("9999 forward".into());
        assert_eq!(err.to_string(), "period out of range: 9999 forward");
    }
}
