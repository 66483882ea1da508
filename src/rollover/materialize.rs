//! Recurring template materialization.
//!
//! Turns every applicable template into at most one task per period key,
//! plus at most one reminder per created task.

use chrono::{DateTime, NaiveDate, Utc};
use horizons_period::{Horizon, Tz, local_to_utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::store::queries;

/// Counts from one materialization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeStats {
    pub tasks_created: usize,
    pub reminders_created: usize,
    /// Templates that already had an instance in the period.
    pub skipped: usize,
}

/// Instantiate applicable templates of `horizon` into `period_key`.
///
/// A template applies when it is active and its `[start_date, end_date]`
/// window covers `period_start`. Any existing task carrying the template's id
/// in `period_key` (a fresh instance or one migrated from the previous
/// period) suppresses a new one, so repeated passes create nothing.
///
/// Must run inside the caller's transaction.
pub(crate) fn materialize_into(
    conn: &Connection,
    user_id: i64,
    horizon: Horizon,
    tz: Tz,
    period_key: &str,
    period_start: NaiveDate,
    now: DateTime<Utc>,
) -> Result<MaterializeStats> {
    let mut stats = MaterializeStats::default();

    for template in queries::applicable_templates(conn, user_id, horizon, period_start)? {
        if queries::template_instance_exists(conn, user_id, template.id, period_key)? {
            stats.skipped += 1;
            continue;
        }

        let task_id = queries::insert_task(
            conn,
            user_id,
            &template.instance_for(period_key),
            Some(template.id),
            now,
        )?;
        stats.tasks_created += 1;

        if let Some(time) = template.reminder_time() {
            let remind_at = local_to_utc(tz, period_start, time);
            queries::insert_reminder(conn, user_id, task_id, remind_at, now)?;
            stats.reminders_created += 1;
        }

        debug!(
            user_id,
            template_id = template.id,
            task_id,
            period_key,
            "materialized recurring template"
        );
    }

    Ok(stats)
}
