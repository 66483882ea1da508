//! Persistent planner state.
//!
//! Sub-modules:
//! - `types`: record types and enums shared with the façade.
//! - `schema`: SQLite DDL.
//! - `queries`: connection-level statements reused inside rollover transactions.
//! - `sqlite`: the `SqlitePlannerStore` handle.

pub(crate) mod queries;
pub(crate) mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::{DEFAULT_BUSY_TIMEOUT_MS, SqlitePlannerStore};
pub use types::{
    DueReminder, NewTask, NewTemplate, PlanningState, Priority, RecurringTemplate, Reminder, Task,
    TaskStatus, UnknownVariant, UserRecord, parse_time_of_day,
};
