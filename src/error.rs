//! Error types for the horizons planner.

use horizons_period::{Horizon, PeriodError};

/// Top-level error type for the planner core.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Unknown horizon token.
    #[error("invalid horizon: {0}")]
    InvalidHorizon(String),

    /// A period key that does not parse under the claimed horizon.
    #[error("invalid {horizon} period key: {key}")]
    InvalidPeriodKey { horizon: Horizon, key: String },

    /// The user's time-zone identifier is not an IANA zone.
    #[error("invalid time zone: {0}")]
    InvalidTimezone(String),

    /// Period arithmetic left the supported year range.
    #[error("period out of range: {0}")]
    PeriodOutOfRange(String),

    /// The referenced user has no planning-state record.
    #[error("user not found: {0}")]
    UserNotFound(i64),

    /// The referenced task does not exist for this user.
    #[error("task not found: {0}")]
    TaskNotFound(i64),

    /// The referenced template does not exist for this user.
    #[error("template not found: {0}")]
    TemplateNotFound(i64),

    /// The referenced reminder does not exist for this user.
    #[error("reminder not found: {0}")]
    ReminderNotFound(i64),

    /// The operation does not apply to the record in its current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Underlying SQLite failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    Lock(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlannerError {
    /// Whether repeating the operation from scratch may succeed.
    ///
    /// Rollover is idempotent, so a failed `reconcile` can always be retried
    /// after a storage or lock failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Lock(_))
    }
}

impl From<PeriodError> for PlannerError {
    fn from(e: PeriodError) -> Self {
        match e {
            PeriodError::InvalidHorizon(token) => Self::InvalidHorizon(token),
            PeriodError::InvalidPeriodKey { horizon, key } => {
                Self::InvalidPeriodKey { horizon, key }
            }
            PeriodError::InvalidTimezone(name) => Self::InvalidTimezone(name),
            PeriodError::OutOfRange(msg) => Self::PeriodOutOfRange(msg),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PlannerError>;
