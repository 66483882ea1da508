//! The six planning cadences.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PeriodError;

/// A planning cadence under which tasks and templates are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Horizon {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl Horizon {
    /// All horizons, shortest cadence first.
    pub const ALL: [Horizon; 6] = [
        Horizon::Daily,
        Horizon::Weekly,
        Horizon::Monthly,
        Horizon::Quarterly,
        Horizon::HalfYearly,
        Horizon::Yearly,
    ];

    /// Canonical token, as stored and accepted on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::HalfYearly => "HALF_YEARLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Length of one period in calendar months, or `None` for the day- and
    /// week-based cadences.
    #[must_use]
    pub fn months_per_period(self) -> Option<u32> {
        match self {
            Self::Daily | Self::Weekly => None,
            Self::Monthly => Some(1),
            Self::Quarterly => Some(3),
            Self::HalfYearly => Some(6),
            Self::Yearly => Some(12),
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Horizon {
    type Err = PeriodError;

    /// Parses a horizon token. Case-insensitive; surrounding whitespace is
    /// ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .into_iter()
            .find(|h| h.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| PeriodError::InvalidHorizon(token.to_owned()))
    }
}
