//! horizons: period rollover engine for a multi-horizon personal planner.
//!
//! Tasks live in periods of six cadences (daily through yearly), keyed by
//! strings computed in each user's own time zone. Whenever a user touches a
//! horizon, the [`RolloverCoordinator`] checks whether a period boundary has
//! passed since the last visit and, if so, transactionally:
//!
//! - moves unfinished tasks of the preceding period forward,
//! - archives finished ones,
//! - materializes recurring templates (and their reminders) into the new
//!   period.
//!
//! Period arithmetic lives in the pure [`horizons_period`] crate; state lives
//! in SQLite behind [`SqlitePlannerStore`]; [`Planner`] is the façade clients
//! call.

pub mod config;
pub mod error;
pub mod horizons_dirs;
pub mod planner;
pub mod rollover;
pub mod store;

pub use config::PlannerConfig;
pub use error::{PlannerError, Result};
pub use planner::{PeriodSelector, PeriodTasks, Planner, PushOutcome, TaskDraft};
pub use rollover::{MaterializeStats, RolloverCoordinator, RolloverOutcome, RolloverStats};
pub use store::SqlitePlannerStore;

pub use horizons_period::{Direction, Horizon, Tz};
