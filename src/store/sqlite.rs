//! SQLite-backed planner store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use horizons_period::{Horizon, parse_timezone, validate_period_key};
use rusqlite::{Connection, TransactionBehavior, params};

use super::queries::{self, REMINDER_COLUMNS, TASK_COLUMNS, TEMPLATE_COLUMNS};
use super::schema::{apply_schema, read_schema_version};
use super::types::{
    DueReminder, NewTask, NewTemplate, PlanningState, RecurringTemplate, Reminder, Task,
    TaskStatus, UserRecord, to_epoch,
};
use crate::config::StoreConfig;
use crate::error::{PlannerError, Result};

/// Busy timeout used by [`SqlitePlannerStore::open`].
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite-backed planner store.
///
/// Thread-safe via an internal `Mutex<Connection>`. Several stores may open
/// the same file; their writers serialize on SQLite's lock, waiting up to the
/// configured busy timeout.
pub struct SqlitePlannerStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqlitePlannerStore {
    /// Open (or create) the database at `path` with the default busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
    }

    /// Open the database named by a [`StoreConfig`].
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_with_config(config: &StoreConfig) -> Result<Self> {
        Self::open_with_timeout(
            &config.db_path,
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        apply_schema(&conn)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Database file path; `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<Option<u32>> {
        let conn = self.lock()?;
        Ok(read_schema_version(&conn)?)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Create a user in the given IANA zone.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimezone` for an unknown zone.
    pub fn create_user(&self, timezone: &str, now: DateTime<Utc>) -> Result<UserRecord> {
        let tz = parse_timezone(timezone)?;
        let conn = self.lock()?;
        let now = to_epoch(now);
        conn.execute(
            "INSERT INTO users (timezone, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![tz.name(), now],
        )?;
        Ok(UserRecord {
            id: conn.last_insert_rowid(),
            timezone: tz.name().to_owned(),
        })
    }

    pub fn user(&self, user_id: i64) -> Result<UserRecord> {
        let conn = self.lock()?;
        queries::read_user(&conn, user_id)
    }

    /// Change a user's zone. Period keys already stored are left as they are;
    /// the next reconcile compares them against the new zone's wall clock.
    pub fn set_timezone(
        &self,
        user_id: i64,
        timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecord> {
        let tz = parse_timezone(timezone)?;
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE users SET timezone = ?1, updated_at = ?2 WHERE id = ?3",
            params![tz.name(), to_epoch(now), user_id],
        )?;
        if rows == 0 {
            return Err(PlannerError::UserNotFound(user_id));
        }
        Ok(UserRecord {
            id: user_id,
            timezone: tz.name().to_owned(),
        })
    }

    /// The user's zone and last observed key per horizon.
    pub fn planning_state(&self, user_id: i64) -> Result<PlanningState> {
        let conn = self.lock()?;
        let user = queries::read_user(&conn, user_id)?;
        let mut last_observed = std::collections::BTreeMap::new();
        for horizon in Horizon::ALL {
            if let Some(key) = queries::read_last_key(&conn, user_id, horizon)? {
                last_observed.insert(horizon, key);
            }
        }
        Ok(PlanningState {
            user_id: user.id,
            timezone: user.timezone,
            last_observed,
        })
    }

    pub fn last_observed_key(&self, user_id: i64, horizon: Horizon) -> Result<Option<String>> {
        let conn = self.lock()?;
        queries::read_last_key(&conn, user_id, horizon)
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Insert a `PENDING` task.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, `InvalidPeriodKey` when the key does not parse
    /// under the task's horizon, or `InvalidState` for an empty title.
    pub fn insert_task(&self, user_id: i64, task: &NewTask, now: DateTime<Utc>) -> Result<Task> {
        validate_period_key(task.horizon, &task.period_key)?;
        if task.title.trim().is_empty() {
            return Err(PlannerError::InvalidState("task title must not be empty".into()));
        }
        let conn = self.lock()?;
        queries::read_user(&conn, user_id)?;
        let id = queries::insert_task(&conn, user_id, task, None, now)?;
        queries::read_task(&conn, user_id, id)
    }

    pub fn task(&self, user_id: i64, task_id: i64) -> Result<Task> {
        let conn = self.lock()?;
        queries::read_task(&conn, user_id, task_id)
    }

    /// Non-archived tasks of one period, `URGENT` first then newest first.
    pub fn tasks_in_period(&self, user_id: i64, horizon: Horizon, key: &str) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        queries::tasks_in_period(&conn, user_id, horizon, key)
    }

    /// Every task materialized from a template, oldest first.
    pub fn tasks_for_template(&self, user_id: i64, template_id: i64) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 AND template_id = ?2 ORDER BY id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![user_id, template_id], queries::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Set a task's status. Reopening an archived task also clears its
    /// archive stamp.
    pub fn set_task_status(
        &self,
        user_id: i64,
        task_id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let conn = self.lock()?;
        let sql = match status {
            TaskStatus::Done => {
                "UPDATE tasks SET status = 'DONE', updated_at = ?1 WHERE user_id = ?2 AND id = ?3"
            }
            TaskStatus::Pending => {
                "UPDATE tasks SET status = 'PENDING', archived_at = NULL, updated_at = ?1
                 WHERE user_id = ?2 AND id = ?3"
            }
        };
        let rows = conn.execute(sql, params![to_epoch(now), user_id, task_id])?;
        if rows == 0 {
            return Err(PlannerError::TaskNotFound(task_id));
        }
        queries::read_task(&conn, user_id, task_id)
    }

    /// Move an unarchived task to another key of its own horizon.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the task is archived.
    pub fn move_task(
        &self,
        user_id: i64,
        task_id: i64,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let conn = self.lock()?;
        let task = queries::read_task(&conn, user_id, task_id)?;
        validate_period_key(task.horizon, key)?;
        let rows = conn.execute(
            "UPDATE tasks SET period_key = ?1, updated_at = ?2
             WHERE user_id = ?3 AND id = ?4 AND archived_at IS NULL",
            params![key, to_epoch(now), user_id, task_id],
        )?;
        if rows == 0 {
            return Err(PlannerError::InvalidState(format!(
                "task {task_id} is archived and cannot be moved"
            )));
        }
        queries::read_task(&conn, user_id, task_id)
    }

    /// Un-archive a task into `key` as `PENDING`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the task is not archived.
    pub fn restore_task(
        &self,
        user_id: i64,
        task_id: i64,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let conn = self.lock()?;
        let task = queries::read_task(&conn, user_id, task_id)?;
        validate_period_key(task.horizon, key)?;
        let rows = conn.execute(
            "UPDATE tasks
             SET archived_at = NULL, status = 'PENDING', period_key = ?1, updated_at = ?2
             WHERE user_id = ?3 AND id = ?4 AND archived_at IS NOT NULL",
            params![key, to_epoch(now), user_id, task_id],
        )?;
        if rows == 0 {
            return Err(PlannerError::InvalidState(format!(
                "task {task_id} is not archived"
            )));
        }
        queries::read_task(&conn, user_id, task_id)
    }

    /// Archived tasks, newest archive first.
    pub fn archived_tasks(
        &self,
        user_id: i64,
        horizon: Option<Horizon>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1 AND status = 'DONE' AND archived_at IS NOT NULL
               AND (?2 IS NULL OR horizon = ?2)
             ORDER BY archived_at DESC, id DESC
             LIMIT ?3 OFFSET ?4"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(
                params![user_id, horizon.map(Horizon::as_str), limit, offset],
                queries::row_to_task,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Delete a task and its reminder.
    pub fn delete_task(&self, user_id: i64, task_id: i64) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM tasks WHERE user_id = ?1 AND id = ?2",
            params![user_id, task_id],
        )?;
        if rows == 0 {
            return Err(PlannerError::TaskNotFound(task_id));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Recurring templates
    // -----------------------------------------------------------------------

    /// Insert a recurring template.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for an empty title or an end date before the
    /// start date, `UserNotFound` for an unknown user.
    pub fn insert_template(
        &self,
        user_id: i64,
        template: &NewTemplate,
        now: DateTime<Utc>,
    ) -> Result<RecurringTemplate> {
        if template.title.trim().is_empty() {
            return Err(PlannerError::InvalidState("template title must not be empty".into()));
        }
        if template.end_date.is_some_and(|end| end < template.start_date) {
            return Err(PlannerError::InvalidState(format!(
                "template end date precedes start date {}",
                template.start_date
            )));
        }
        let conn = self.lock()?;
        queries::read_user(&conn, user_id)?;
        let id = queries::insert_template(&conn, user_id, template, now)?;
        queries::read_template(&conn, user_id, id)
    }

    pub fn template(&self, user_id: i64, template_id: i64) -> Result<RecurringTemplate> {
        let conn = self.lock()?;
        queries::read_template(&conn, user_id, template_id)
    }

    /// All of a user's templates, newest first.
    pub fn templates(&self, user_id: i64) -> Result<Vec<RecurringTemplate>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM recurring_templates
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let templates = stmt
            .query_map(params![user_id], queries::row_to_template)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    pub fn set_template_active(
        &self,
        user_id: i64,
        template_id: i64,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<RecurringTemplate> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE recurring_templates SET is_active = ?1, updated_at = ?2
             WHERE user_id = ?3 AND id = ?4",
            params![active, to_epoch(now), user_id, template_id],
        )?;
        if rows == 0 {
            return Err(PlannerError::TemplateNotFound(template_id));
        }
        queries::read_template(&conn, user_id, template_id)
    }

    /// Delete a template. Tasks it produced survive with no template link.
    pub fn delete_template(&self, user_id: i64, template_id: i64) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM recurring_templates WHERE user_id = ?1 AND id = ?2",
            params![user_id, template_id],
        )?;
        if rows == 0 {
            return Err(PlannerError::TemplateNotFound(template_id));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reminders
    // -----------------------------------------------------------------------

    pub fn reminders_for_task(&self, user_id: i64, task_id: i64) -> Result<Vec<Reminder>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = ?1 AND task_id = ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let reminders = stmt
            .query_map(params![user_id, task_id], queries::row_to_reminder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reminders)
    }

    /// Unread reminders with their task, earliest first.
    pub fn unread_reminders(&self, user_id: i64) -> Result<Vec<DueReminder>> {
        let conn = self.lock()?;
        queries::unread_reminders(&conn, user_id)
    }

    pub fn mark_reminder_read(&self, user_id: i64, reminder_id: i64) -> Result<()> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE reminders SET is_read = 1 WHERE user_id = ?1 AND id = ?2",
            params![user_id, reminder_id],
        )?;
        if rows == 0 {
            return Err(PlannerError::ReminderNotFound(reminder_id));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Crate-internal access
    // -----------------------------------------------------------------------

    /// Acquire the connection mutex.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PlannerError::Lock(e.to_string()))
    }

    /// Run `f` on the connection outside any explicit transaction.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so two callers never both read a
    /// stale state and then both write. Any error rolls back everything `f`
    /// did.
    pub(crate) fn with_immediate_tx<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::super::types::{CURRENT_SCHEMA_VERSION, Priority};
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn test_store() -> (SqlitePlannerStore, UserRecord) {
        let store = SqlitePlannerStore::open_in_memory().expect("open store");
        let user = store.create_user("UTC", at(0)).expect("create user");
        (store, user)
    }

    #[test]
    fn file_store_creates_parent_dirs_and_schema() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("planner.db");
        let store = SqlitePlannerStore::open(&path).expect("open");
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(store.schema_version().unwrap(), Some(CURRENT_SCHEMA_VERSION));
        assert!(path.exists());
    }

    #[test]
    fn create_user_rejects_unknown_zone() {
        let store = SqlitePlannerStore::open_in_memory().unwrap();
        let err = store.create_user("Mars/Olympus", at(0)).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidTimezone(_)));
    }

    #[test]
    fn set_timezone_updates_user() {
        let (store, user) = test_store();
        store.set_timezone(user.id, "Asia/Tokyo", at(5)).unwrap();
        assert_eq!(store.user(user.id).unwrap().timezone, "Asia/Tokyo");
        assert!(matches!(
            store.set_timezone(999, "UTC", at(5)),
            Err(PlannerError::UserNotFound(999))
        ));
    }

    #[test]
    fn insert_task_validates_key_and_user() {
        let (store, user) = test_store();
        let bad_key = NewTask::new("Plan", Horizon::Weekly, "2026-02");
        assert!(matches!(
            store.insert_task(user.id, &bad_key, at(0)),
            Err(PlannerError::InvalidPeriodKey { .. })
        ));
        let ok = NewTask::new("Plan", Horizon::Weekly, "2026-W08");
        assert!(matches!(
            store.insert_task(42, &ok, at(0)),
            Err(PlannerError::UserNotFound(42))
        ));
        let task = store.insert_task(user.id, &ok, at(0)).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.template_id, None);
    }

    #[test]
    fn tasks_in_period_orders_by_priority_then_newest() {
        let (store, user) = test_store();
        let mk = |title: &str, priority: Priority, secs: i64| {
            let task = NewTask {
                priority,
                ..NewTask::new(title, Horizon::Daily, "2026-02-21")
            };
            store.insert_task(user.id, &task, at(secs)).unwrap();
        };
        mk("low", Priority::Low, 1);
        mk("urgent", Priority::Urgent, 2);
        mk("medium old", Priority::Medium, 3);
        mk("medium new", Priority::Medium, 4);

        let titles: Vec<String> = store
            .tasks_in_period(user.id, Horizon::Daily, "2026-02-21")
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["urgent", "medium new", "medium old", "low"]);
    }

    #[test]
    fn reopening_clears_archive_stamp() {
        let (store, user) = test_store();
        let task = store
            .insert_task(user.id, &NewTask::new("x", Horizon::Daily, "2026-02-20"), at(0))
            .unwrap();
        store.set_task_status(user.id, task.id, TaskStatus::Done, at(1)).unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE tasks SET archived_at = 2 WHERE id = ?1",
                params![task.id],
            )
            .unwrap();
        }
        let reopened = store
            .set_task_status(user.id, task.id, TaskStatus::Pending, at(3))
            .unwrap();
        assert_eq!(reopened.status, TaskStatus::Pending);
        assert_eq!(reopened.archived_at, None);
    }

    #[test]
    fn move_task_rejects_key_of_other_horizon() {
        let (store, user) = test_store();
        let task = store
            .insert_task(user.id, &NewTask::new("x", Horizon::Monthly, "2026-02"), at(0))
            .unwrap();
        assert!(store.move_task(user.id, task.id, "2026-Q1", at(1)).is_err());
        let moved = store.move_task(user.id, task.id, "2026-03", at(1)).unwrap();
        assert_eq!(moved.period_key, "2026-03");
        assert_eq!(moved.updated_at, at(1));
    }

    #[test]
    fn move_and_restore_check_archive_state_in_the_update() {
        let (store, user) = test_store();
        let task = store
            .insert_task(user.id, &NewTask::new("x", Horizon::Daily, "2026-02-20"), at(0))
            .unwrap();

        assert!(matches!(
            store.restore_task(user.id, task.id, "2026-02-21", at(1)),
            Err(PlannerError::InvalidState(_))
        ));
        assert_eq!(store.task(user.id, task.id).unwrap().period_key, "2026-02-20");

        store.set_task_status(user.id, task.id, TaskStatus::Done, at(2)).unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE tasks SET archived_at = 3 WHERE id = ?1",
                params![task.id],
            )
            .unwrap();
        }
        assert!(matches!(
            store.move_task(user.id, task.id, "2026-02-21", at(4)),
            Err(PlannerError::InvalidState(_))
        ));
        let archived = store.task(user.id, task.id).unwrap();
        assert_eq!(archived.period_key, "2026-02-20");
        assert!(archived.is_archived());

        let restored = store.restore_task(user.id, task.id, "2026-02-21", at(5)).unwrap();
        assert_eq!(restored.status, TaskStatus::Pending);
        assert_eq!(restored.archived_at, None);
        assert_eq!(restored.period_key, "2026-02-21");
    }

    #[test]
    fn template_validation_and_listing() {
        let (store, user) = test_store();
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut backwards = NewTemplate::new("x", Horizon::Daily, start);
        backwards.end_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        assert!(matches!(
            store.insert_template(user.id, &backwards, at(0)),
            Err(PlannerError::InvalidState(_))
        ));

        let first = store
            .insert_template(user.id, &NewTemplate::new("first", Horizon::Daily, start), at(1))
            .unwrap();
        let second = store
            .insert_template(
                user.id,
                &NewTemplate::new("second", Horizon::Weekly, start)
                    .with_reminder(chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
                at(2),
            )
            .unwrap();
        assert_eq!(second.reminder_time(), chrono::NaiveTime::from_hms_opt(8, 0, 0));

        let listed: Vec<i64> = store.templates(user.id).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(listed, [second.id, first.id]);

        let paused = store.set_template_active(user.id, first.id, false, at(3)).unwrap();
        assert!(!paused.is_active);
        store.delete_template(user.id, second.id).unwrap();
        assert!(matches!(
            store.template(user.id, second.id),
            Err(PlannerError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn archived_tasks_paginate_newest_first() {
        let (store, user) = test_store();
        for i in 0..5 {
            let task = store
                .insert_task(user.id, &NewTask::new(format!("t{i}"), Horizon::Daily, "2026-01-01"), at(0))
                .unwrap();
            store.set_task_status(user.id, task.id, TaskStatus::Done, at(1)).unwrap();
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE tasks SET archived_at = ?1 WHERE id = ?2",
                params![100 + i, task.id],
            )
            .unwrap();
        }
        let page: Vec<String> = store
            .archived_tasks(user.id, None, 2, 1)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(page, ["t3", "t2"]);
        assert!(store.archived_tasks(user.id, Some(Horizon::Weekly), 10, 0).unwrap().is_empty());
    }

    #[test]
    fn mark_unknown_reminder_is_not_found() {
        let (store, user) = test_store();
        assert!(matches!(
            store.mark_reminder_read(user.id, 77),
            Err(PlannerError::ReminderNotFound(77))
        ));
    }

    #[test]
    fn delete_task_cascades_to_reminder() {
        let (store, user) = test_store();
        let task = store
            .insert_task(user.id, &NewTask::new("x", Horizon::Daily, "2026-01-01"), at(0))
            .unwrap();
        store
            .with_conn(|conn| queries::insert_reminder(conn, user.id, task.id, at(10), at(0)))
            .unwrap();
        assert_eq!(store.unread_reminders(user.id).unwrap().len(), 1);
        store.delete_task(user.id, task.id).unwrap();
        assert!(store.unread_reminders(user.id).unwrap().is_empty());
    }

    #[test]
    fn immediate_tx_rolls_back_on_error() {
        let (store, user) = test_store();
        let result: Result<()> = store.with_immediate_tx(|conn| {
            queries::write_last_key(conn, user.id, Horizon::Daily, "2026-01-01", at(0))?;
            Err(PlannerError::InvalidState("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.last_observed_key(user.id, Horizon::Daily).unwrap(), None);
    }

    #[test]
    fn concurrent_task_inserts_are_all_kept() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let store = std::sync::Arc::new(
            SqlitePlannerStore::open(&dir.path().join("planner.db")).expect("open"),
        );
        let user = store.create_user("UTC", at(0)).unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let s = std::sync::Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                s.insert_task(
                    user.id,
                    &NewTask::new(format!("task {i}"), Horizon::Daily, "2026-01-01"),
                    at(i),
                )
                .expect("concurrent insert");
            }));
        }
        for h in handles {
            h.join().expect("thread join");
        }
        assert_eq!(
            store.tasks_in_period(user.id, Horizon::Daily, "2026-01-01").unwrap().len(),
            8
        );
    }
}
