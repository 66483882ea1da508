//! Planner façade: the operations a client performs, each bringing the
//! affected horizon up to date before it touches tasks.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use horizons_period::{Horizon, next_period_key, validate_period_key};
use serde::Serialize;

use crate::config::PlannerDefaults;
use crate::error::{PlannerError, Result};
use crate::rollover::{RolloverCoordinator, RolloverOutcome};
use crate::store::{
    DueReminder, NewTask, NewTemplate, Priority, RecurringTemplate, SqlitePlannerStore, Task,
    TaskStatus, UserRecord,
};

/// Which period of a horizon an operation addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PeriodSelector {
    /// The period containing the user's wall clock.
    #[default]
    Current,
    /// The period after the current one.
    Tomorrow,
    /// A literal key, validated against the horizon when resolved.
    Key(String),
}

impl FromStr for PeriodSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.eq_ignore_ascii_case("current") {
            Self::Current
        } else if s.eq_ignore_ascii_case("tomorrow") {
            Self::Tomorrow
        } else {
            Self::Key(s.to_owned())
        })
    }
}

impl fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Tomorrow => f.write_str("tomorrow"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

/// Tasks of one resolved period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodTasks {
    pub period_key: String,
    pub tasks: Vec<Task>,
}

/// A task to create in a period chosen by selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub horizon: Horizon,
    pub priority: Priority,
    pub period: PeriodSelector,
    pub due_at: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, horizon: Horizon) -> Self {
        Self {
            title: title.into(),
            description: None,
            horizon,
            priority: Priority::default(),
            period: PeriodSelector::Current,
            due_at: None,
        }
    }
}

/// Result of [`Planner::push_task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushOutcome {
    pub task: Task,
    pub next_key: String,
}

/// Entry point for planner operations.
pub struct Planner {
    coordinator: RolloverCoordinator,
    defaults: PlannerDefaults,
}

impl Planner {
    pub fn new(store: Arc<SqlitePlannerStore>) -> Self {
        Self {
            coordinator: RolloverCoordinator::new(store),
            defaults: PlannerDefaults::default(),
        }
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: PlannerDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn store(&self) -> &SqlitePlannerStore {
        self.coordinator.store()
    }

    pub fn coordinator(&self) -> &RolloverCoordinator {
        &self.coordinator
    }

    pub fn reconcile(
        &self,
        user_id: i64,
        horizon: Horizon,
        now: DateTime<Utc>,
    ) -> Result<RolloverOutcome> {
        self.coordinator.reconcile(user_id, horizon, now)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Create a user, in the configured default zone when none is given.
    pub fn create_user(&self, timezone: Option<&str>, now: DateTime<Utc>) -> Result<UserRecord> {
        let timezone = timezone.unwrap_or(self.defaults.default_timezone.as_str());
        self.store().create_user(timezone, now)
    }

    pub fn set_timezone(
        &self,
        user_id: i64,
        timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecord> {
        self.store().set_timezone(user_id, timezone, now)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Reconcile `horizon` and turn `selector` into a concrete key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` for a literal key of another horizon, plus
    /// anything [`reconcile`](Self::reconcile) returns.
    pub fn resolve_period(
        &self,
        user_id: i64,
        horizon: Horizon,
        selector: &PeriodSelector,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let outcome = self.reconcile(user_id, horizon, now)?;
        match selector {
            PeriodSelector::Current => Ok(outcome.current_key),
            PeriodSelector::Tomorrow => Ok(next_period_key(horizon, &outcome.current_key)?),
            PeriodSelector::Key(key) => {
                validate_period_key(horizon, key)?;
                Ok(key.clone())
            }
        }
    }

    /// Non-archived tasks of the selected period.
    pub fn list_tasks(
        &self,
        user_id: i64,
        horizon: Horizon,
        selector: &PeriodSelector,
        now: DateTime<Utc>,
    ) -> Result<PeriodTasks> {
        let period_key = self.resolve_period(user_id, horizon, selector, now)?;
        let tasks = self.store().tasks_in_period(user_id, horizon, &period_key)?;
        Ok(PeriodTasks { period_key, tasks })
    }

    /// Insert a `PENDING` task into the period named by the draft's selector.
    pub fn create_task(&self, user_id: i64, draft: TaskDraft, now: DateTime<Utc>) -> Result<Task> {
        let period_key = self.resolve_period(user_id, draft.horizon, &draft.period, now)?;
        let task = NewTask {
            title: draft.title,
            description: draft.description,
            horizon: draft.horizon,
            priority: draft.priority,
            period_key,
            due_at: draft.due_at,
        };
        self.store().insert_task(user_id, &task, now)
    }

    pub fn complete_task(&self, user_id: i64, task_id: i64, now: DateTime<Utc>) -> Result<Task> {
        self.store().set_task_status(user_id, task_id, TaskStatus::Done, now)
    }

    pub fn reopen_task(&self, user_id: i64, task_id: i64, now: DateTime<Utc>) -> Result<Task> {
        self.store().set_task_status(user_id, task_id, TaskStatus::Pending, now)
    }

    /// Move a task one period forward from its own key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for archived tasks and `TaskNotFound` for
    /// unknown ones.
    pub fn push_task(&self, user_id: i64, task_id: i64, now: DateTime<Utc>) -> Result<PushOutcome> {
        let horizon = self.store().task(user_id, task_id)?.horizon;
        self.reconcile(user_id, horizon, now)?;

        let task = self.store().task(user_id, task_id)?;
        if task.is_archived() {
            return Err(PlannerError::InvalidState(format!(
                "task {task_id} is archived and cannot be pushed"
            )));
        }
        let next_key = next_period_key(horizon, &task.period_key)?;
        let task = self.store().move_task(user_id, task_id, &next_key, now)?;
        Ok(PushOutcome { task, next_key })
    }

    /// Archived tasks, newest archive first. `limit` falls back to the
    /// configured page size and is capped.
    pub fn vault(
        &self,
        user_id: i64,
        horizon: Option<Horizon>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Task>> {
        let limit = self.defaults.vault_limit(limit);
        self.store().archived_tasks(user_id, horizon, limit, offset)
    }

    /// Bring an archived task back as `PENDING` in its horizon's current
    /// period.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the task is not archived.
    pub fn restore_task(&self, user_id: i64, task_id: i64, now: DateTime<Utc>) -> Result<Task> {
        let task = self.store().task(user_id, task_id)?;
        if !task.is_archived() {
            return Err(PlannerError::InvalidState(format!(
                "task {task_id} is not archived"
            )));
        }
        let outcome = self.reconcile(user_id, task.horizon, now)?;
        self.store()
            .restore_task(user_id, task_id, &outcome.current_key, now)
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub fn add_template(
        &self,
        user_id: i64,
        template: &NewTemplate,
        now: DateTime<Utc>,
    ) -> Result<RecurringTemplate> {
        self.store().insert_template(user_id, template, now)
    }

    pub fn templates(&self, user_id: i64) -> Result<Vec<RecurringTemplate>> {
        self.store().templates(user_id)
    }

    pub fn set_template_active(
        &self,
        user_id: i64,
        template_id: i64,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<RecurringTemplate> {
        self.store()
            .set_template_active(user_id, template_id, active, now)
    }

    pub fn delete_template(&self, user_id: i64, template_id: i64) -> Result<()> {
        self.store().delete_template(user_id, template_id)
    }

    // -----------------------------------------------------------------------
    // Reminders
    // -----------------------------------------------------------------------

    pub fn unread_reminders(&self, user_id: i64) -> Result<Vec<DueReminder>> {
        self.store().unread_reminders(user_id)
    }

    pub fn mark_reminder_read(&self, user_id: i64, reminder_id: i64) -> Result<()> {
        self.store().mark_reminder_read(user_id, reminder_id)
    }
}
