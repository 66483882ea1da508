//! Connection-level statements shared by [`SqlitePlannerStore`] and the
//! rollover transaction.
//!
//! Every function takes a borrowed [`Connection`] (a `Transaction` derefs to
//! one) and never opens its own transaction.
//!
//! [`SqlitePlannerStore`]: super::SqlitePlannerStore

use chrono::{DateTime, NaiveDate, Utc};
use horizons_period::Horizon;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::types::{
    DueReminder, NewTask, NewTemplate, Priority, RecurringTemplate, Reminder, Task, TaskStatus,
    UserRecord, format_date, format_time_of_day, from_epoch, parse_time_of_day, to_epoch,
};
use crate::error::{PlannerError, Result};

pub(crate) const TASK_COLUMNS: &str = "id, user_id, title, description, horizon, priority, status, \
     period_key, due_at, template_id, archived_at, created_at, updated_at";

pub(crate) const TEMPLATE_COLUMNS: &str = "id, user_id, title, description, horizon, priority, \
     is_active, start_date, end_date, reminder_enabled, reminder_time_local, created_at, updated_at";

pub(crate) const REMINDER_COLUMNS: &str = "id, user_id, task_id, remind_at, is_read, created_at";

/// `URGENT` first.
const PRIORITY_RANK_SQL: &str = "CASE priority \
     WHEN 'URGENT' THEN 0 WHEN 'HIGH' THEN 1 WHEN 'MEDIUM' THEN 2 ELSE 3 END";

// ---------------------------------------------------------------------------
// Users and planning state
// ---------------------------------------------------------------------------

pub(crate) fn read_user(conn: &Connection, user_id: i64) -> Result<UserRecord> {
    conn.query_row(
        "SELECT id, timezone FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                timezone: row.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or(PlannerError::UserNotFound(user_id))
}

pub(crate) fn read_last_key(
    conn: &Connection,
    user_id: i64,
    horizon: Horizon,
) -> Result<Option<String>> {
    let key = conn
        .query_row(
            "SELECT last_period_key FROM planning_state WHERE user_id = ?1 AND horizon = ?2",
            params![user_id, horizon.as_str()],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(key.flatten())
}

pub(crate) fn write_last_key(
    conn: &Connection,
    user_id: i64,
    horizon: Horizon,
    key: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO planning_state (user_id, horizon, last_period_key, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id, horizon)
         DO UPDATE SET last_period_key = excluded.last_period_key, updated_at = excluded.updated_at",
        params![user_id, horizon.as_str(), key, to_epoch(now)],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Rollover set updates
// ---------------------------------------------------------------------------

/// Move every pending task of `from` to `to`. Returns the number moved.
pub(crate) fn migrate_pending(
    conn: &Connection,
    user_id: i64,
    horizon: Horizon,
    from: &str,
    to: &str,
    now: DateTime<Utc>,
) -> Result<usize> {
    let moved = conn.execute(
        "UPDATE tasks SET period_key = ?1, updated_at = ?2
         WHERE user_id = ?3 AND horizon = ?4 AND period_key = ?5 AND status = 'PENDING'",
        params![to, to_epoch(now), user_id, horizon.as_str(), from],
    )?;
    Ok(moved)
}

/// Stamp every unarchived done task of `key`. Returns the number archived.
pub(crate) fn archive_done(
    conn: &Connection,
    user_id: i64,
    horizon: Horizon,
    key: &str,
    now: DateTime<Utc>,
) -> Result<usize> {
    let now = to_epoch(now);
    let archived = conn.execute(
        "UPDATE tasks SET archived_at = ?1, updated_at = ?1
         WHERE user_id = ?2 AND horizon = ?3 AND period_key = ?4
           AND status = 'DONE' AND archived_at IS NULL",
        params![now, user_id, horizon.as_str(), key],
    )?;
    Ok(archived)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub(crate) fn insert_task(
    conn: &Connection,
    user_id: i64,
    task: &NewTask,
    template_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<i64> {
    let now = to_epoch(now);
    conn.execute(
        "INSERT INTO tasks
            (user_id, title, description, horizon, priority, status, period_key,
             due_at, template_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'PENDING', ?6, ?7, ?8, ?9, ?9)",
        params![
            user_id,
            task.title,
            task.description,
            task.horizon.as_str(),
            task.priority.as_str(),
            task.period_key,
            task.due_at.map(to_epoch),
            template_id,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn read_task(conn: &Connection, user_id: i64, task_id: i64) -> Result<Task> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 AND id = ?2");
    conn.query_row(&sql, params![user_id, task_id], row_to_task)
        .optional()?
        .ok_or(PlannerError::TaskNotFound(task_id))
}

/// Non-archived tasks of one period, `URGENT` first then newest first.
pub(crate) fn tasks_in_period(
    conn: &Connection,
    user_id: i64,
    horizon: Horizon,
    key: &str,
) -> Result<Vec<Task>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE user_id = ?1 AND horizon = ?2 AND period_key = ?3 AND archived_at IS NULL
         ORDER BY {PRIORITY_RANK_SQL}, created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params![user_id, horizon.as_str(), key], row_to_task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

pub(crate) fn template_instance_exists(
    conn: &Connection,
    user_id: i64,
    template_id: i64,
    key: &str,
) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM tasks WHERE user_id = ?1 AND template_id = ?2 AND period_key = ?3
         )",
        params![user_id, template_id, key],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

pub(crate) fn insert_template(
    conn: &Connection,
    user_id: i64,
    template: &NewTemplate,
    now: DateTime<Utc>,
) -> Result<i64> {
    let now = to_epoch(now);
    conn.execute(
        "INSERT INTO recurring_templates
            (user_id, title, description, horizon, priority, is_active, start_date, end_date,
             reminder_enabled, reminder_time_local, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            user_id,
            template.title,
            template.description,
            template.horizon.as_str(),
            template.priority.as_str(),
            template.is_active,
            format_date(template.start_date),
            template.end_date.map(format_date),
            template.reminder_enabled,
            template.reminder_time_local.map(format_time_of_day),
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn read_template(
    conn: &Connection,
    user_id: i64,
    template_id: i64,
) -> Result<RecurringTemplate> {
    let sql = format!(
        "SELECT {TEMPLATE_COLUMNS} FROM recurring_templates WHERE user_id = ?1 AND id = ?2"
    );
    conn.query_row(&sql, params![user_id, template_id], row_to_template)
        .optional()?
        .ok_or(PlannerError::TemplateNotFound(template_id))
}

/// Active templates of one horizon whose date window covers `period_start`,
/// in id order.
pub(crate) fn applicable_templates(
    conn: &Connection,
    user_id: i64,
    horizon: Horizon,
    period_start: NaiveDate,
) -> Result<Vec<RecurringTemplate>> {
    let sql = format!(
        "SELECT {TEMPLATE_COLUMNS} FROM recurring_templates
         WHERE user_id = ?1 AND horizon = ?2 AND is_active = 1
           AND start_date <= ?3 AND (end_date IS NULL OR end_date >= ?3)
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let templates = stmt
        .query_map(
            params![user_id, horizon.as_str(), format_date(period_start)],
            row_to_template,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(templates)
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

pub(crate) fn insert_reminder(
    conn: &Connection,
    user_id: i64,
    task_id: i64,
    remind_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO reminders (user_id, task_id, remind_at, is_read, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![user_id, task_id, to_epoch(remind_at), to_epoch(now)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn unread_reminders(conn: &Connection, user_id: i64) -> Result<Vec<DueReminder>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.task_id, r.remind_at, t.title, t.horizon, t.period_key
         FROM reminders r
         JOIN tasks t ON t.id = r.task_id
         WHERE r.user_id = ?1 AND r.is_read = 0
         ORDER BY r.remind_at ASC, r.id ASC",
    )?;
    let due = stmt
        .query_map(params![user_id], row_to_due_reminder)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(due)
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

pub(crate) fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        horizon: parse_text(row, 4, str::parse::<Horizon>)?,
        priority: parse_text(row, 5, str::parse::<Priority>)?,
        status: parse_text(row, 6, str::parse::<TaskStatus>)?,
        period_key: row.get(7)?,
        due_at: opt_instant(row, 8)?,
        template_id: row.get(9)?,
        archived_at: opt_instant(row, 10)?,
        created_at: instant(row, 11)?,
        updated_at: instant(row, 12)?,
    })
}

pub(crate) fn row_to_template(row: &Row<'_>) -> rusqlite::Result<RecurringTemplate> {
    Ok(RecurringTemplate {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        horizon: parse_text(row, 4, str::parse::<Horizon>)?,
        priority: parse_text(row, 5, str::parse::<Priority>)?,
        is_active: row.get(6)?,
        start_date: parse_text(row, 7, parse_date)?,
        end_date: parse_opt_text(row, 8, parse_date)?,
        reminder_enabled: row.get(9)?,
        reminder_time_local: parse_opt_text(row, 10, parse_time_of_day)?,
        created_at: instant(row, 11)?,
        updated_at: instant(row, 12)?,
    })
}

pub(crate) fn row_to_reminder(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        task_id: row.get(2)?,
        remind_at: instant(row, 3)?,
        is_read: row.get(4)?,
        created_at: instant(row, 5)?,
    })
}

fn row_to_due_reminder(row: &Row<'_>) -> rusqlite::Result<DueReminder> {
    Ok(DueReminder {
        id: row.get(0)?,
        task_id: row.get(1)?,
        remind_at: instant(row, 2)?,
        title: row.get(3)?,
        horizon: parse_text(row, 4, str::parse::<Horizon>)?,
        period_key: row.get(5)?,
    })
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
}

fn parse_text<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_text<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<Option<T>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        parse(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    from_epoch(secs).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

fn opt_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let secs: Option<i64> = row.get(idx)?;
    secs.map(|secs| from_epoch(secs).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs)))
        .transpose()
}
