//! Lazy, transactional period rollover.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use horizons_period::{
    Horizon, Tz, current_period_key, parse_timezone, period_start, previous_period_key,
    validate_period_key,
};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::materialize::{MaterializeStats, materialize_into};
use crate::error::Result;
use crate::store::{SqlitePlannerStore, queries};

/// Counts from one rollover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RolloverStats {
    /// Pending tasks moved from the previous period.
    pub migrated: usize,
    /// Done tasks of the previous period stamped as archived.
    pub archived: usize,
    pub tasks_created: usize,
    pub reminders_created: usize,
}

/// Result of [`RolloverCoordinator::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolloverOutcome {
    /// The period key of the user's wall clock.
    pub current_key: String,
    pub did_rollover: bool,
    pub stats: RolloverStats,
}

impl RolloverOutcome {
    fn unchanged(current_key: String) -> Self {
        Self {
            current_key,
            did_rollover: false,
            stats: RolloverStats::default(),
        }
    }
}

/// What reconcile has to do for one `(user, horizon)`.
enum Decision {
    UpToDate(RolloverOutcome),
    Stale(PendingRollover),
}

struct PendingRollover {
    tz: Tz,
    current_key: String,
    current_start: NaiveDate,
    stored_key: Option<String>,
}

/// Advances a user's planning state when a period boundary has passed.
///
/// Each `reconcile` first checks without a write lock; only a stale state
/// takes the `BEGIN IMMEDIATE` path, which re-reads the stored key so the
/// loser of a race sees the winner's commit and does nothing.
pub struct RolloverCoordinator {
    store: Arc<SqlitePlannerStore>,
}

impl RolloverCoordinator {
    pub fn new(store: Arc<SqlitePlannerStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SqlitePlannerStore> {
        &self.store
    }

    /// Bring `(user_id, horizon)` up to the period containing `now`.
    ///
    /// A never-observed horizon counts as stale: the first call records the
    /// key and materializes templates for it. When the stored key is
    /// already the current one, or orders after it, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound`, `InvalidTimezone`, or a storage error. On error
    /// nothing is committed and the call may be repeated.
    pub fn reconcile(
        &self,
        user_id: i64,
        horizon: Horizon,
        now: DateTime<Utc>,
    ) -> Result<RolloverOutcome> {
        if let Decision::UpToDate(outcome) = self
            .store
            .with_conn(|conn| decide(conn, user_id, horizon, now))?
        {
            debug!(user_id, horizon = %horizon, key = %outcome.current_key, "period current");
            return Ok(outcome);
        }

        self.store.with_immediate_tx(|conn| {
            match decide(conn, user_id, horizon, now)? {
                Decision::UpToDate(outcome) => {
                    debug!(user_id, horizon = %horizon, "rollover already applied by another caller");
                    Ok(outcome)
                }
                Decision::Stale(pending) => apply_rollover(conn, user_id, horizon, pending, now),
            }
        })
    }

    /// Materialize templates into `period_key` in a transaction of its own.
    ///
    /// Safe to repeat for the same key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` if `period_key` does not parse under
    /// `horizon`, `UserNotFound`, or a storage error.
    pub fn materialize(
        &self,
        user_id: i64,
        horizon: Horizon,
        period_key: &str,
        now: DateTime<Utc>,
    ) -> Result<MaterializeStats> {
        validate_period_key(horizon, period_key)?;
        let start = period_start(horizon, period_key)?;
        self.store.with_immediate_tx(|conn| {
            let tz = parse_timezone(&queries::read_user(conn, user_id)?.timezone)?;
            materialize_into(conn, user_id, horizon, tz, period_key, start, now)
        })
    }
}

fn decide(conn: &Connection, user_id: i64, horizon: Horizon, now: DateTime<Utc>) -> Result<Decision> {
    let user = queries::read_user(conn, user_id)?;
    let tz = parse_timezone(&user.timezone)?;
    let current_key = current_period_key(horizon, tz, now);
    let current_start = period_start(horizon, &current_key)?;
    let stored_key = queries::read_last_key(conn, user_id, horizon)?;

    if let Some(stored) = stored_key.as_deref() {
        if stored == current_key {
            return Ok(Decision::UpToDate(RolloverOutcome::unchanged(current_key)));
        }
        match period_start(horizon, stored) {
            Ok(stored_start) if stored_start > current_start => {
                warn!(
                    user_id,
                    horizon = %horizon,
                    stored,
                    current = %current_key,
                    "last observed period is ahead of the wall clock; leaving state untouched"
                );
                return Ok(Decision::UpToDate(RolloverOutcome::unchanged(current_key)));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(user_id, horizon = %horizon, stored, error = %e, "unparseable last observed period; treating as stale");
            }
        }
    }

    Ok(Decision::Stale(PendingRollover {
        tz,
        current_key,
        current_start,
        stored_key,
    }))
}

fn apply_rollover(
    conn: &Connection,
    user_id: i64,
    horizon: Horizon,
    pending: PendingRollover,
    now: DateTime<Utc>,
) -> Result<RolloverOutcome> {
    let PendingRollover {
        tz,
        current_key,
        current_start,
        stored_key,
    } = pending;

    let previous_key = previous_period_key(horizon, &current_key)?;
    if let Some(stored) = stored_key.as_deref().filter(|k| *k != previous_key) {
        debug!(
            user_id,
            horizon = %horizon,
            stored,
            previous = %previous_key,
            "periods skipped since last visit; only the immediately preceding one is migrated"
        );
    }

    let migrated = queries::migrate_pending(conn, user_id, horizon, &previous_key, &current_key, now)?;
    let archived = queries::archive_done(conn, user_id, horizon, &previous_key, now)?;
    let materialized =
        materialize_into(conn, user_id, horizon, tz, &current_key, current_start, now)?;
    queries::write_last_key(conn, user_id, horizon, &current_key, now)?;

    let stats = RolloverStats {
        migrated,
        archived,
        tasks_created: materialized.tasks_created,
        reminders_created: materialized.reminders_created,
    };
    info!(
        user_id,
        horizon = %horizon,
        from = stored_key.as_deref().unwrap_or("-"),
        to = %current_key,
        migrated,
        archived,
        created = stats.tasks_created,
        reminders = stats.reminders_created,
        "period rollover applied"
    );

    Ok(RolloverOutcome {
        current_key,
        did_rollover: true,
        stats,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::PlannerError;
    use crate::store::{NewTask, NewTemplate, TaskStatus};
    use rusqlite::params;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn coordinator() -> (RolloverCoordinator, i64) {
        let store = Arc::new(SqlitePlannerStore::open_in_memory().unwrap());
        let user = store.create_user("UTC", utc("2026-01-01T00:00:00Z")).unwrap();
        (RolloverCoordinator::new(store), user.id)
    }

    #[test]
    fn first_reconcile_records_key() {
        let (c, user) = coordinator();
        let now = utc("2026-02-21T10:00:00Z");
        let outcome = c.reconcile(user, Horizon::Daily, now).unwrap();
        assert!(outcome.did_rollover);
        assert_eq!(outcome.current_key, "2026-02-21");
        assert_eq!(
            c.store().last_observed_key(user, Horizon::Daily).unwrap().as_deref(),
            Some("2026-02-21")
        );
    }

    #[test]
    fn unknown_user_is_reported() {
        let (c, _) = coordinator();
        let err = c.reconcile(404, Horizon::Daily, utc("2026-02-21T10:00:00Z")).unwrap_err();
        assert!(matches!(err, PlannerError::UserNotFound(404)));
    }

    #[test]
    fn unparseable_stored_key_is_overwritten() {
        let (c, user) = coordinator();
        c.store()
            .with_conn(|conn| {
                queries::write_last_key(conn, user, Horizon::Weekly, "garbage", utc("2026-01-01T00:00:00Z"))
            })
            .unwrap();
        let outcome = c.reconcile(user, Horizon::Weekly, utc("2026-02-21T10:00:00Z")).unwrap();
        assert!(outcome.did_rollover);
        assert_eq!(
            c.store().last_observed_key(user, Horizon::Weekly).unwrap().as_deref(),
            Some("2026-W08")
        );
    }

    #[test]
    fn failure_mid_rollover_leaves_no_trace_and_retry_succeeds() {
        let (c, user) = coordinator();
        let store = Arc::clone(c.store());
        let day1 = utc("2026-02-20T12:00:00Z");
        let day2 = utc("2026-02-21T12:00:00Z");

        c.reconcile(user, Horizon::Daily, day1).unwrap();
        let pending = store
            .insert_task(user, &NewTask::new("carry", Horizon::Daily, "2026-02-20"), day1)
            .unwrap();
        let done = store
            .insert_task(user, &NewTask::new("finished", Horizon::Daily, "2026-02-20"), day1)
            .unwrap();
        store.set_task_status(user, done.id, TaskStatus::Done, day1).unwrap();

        // A template whose stored reminder time no longer parses fails after
        // migration and archiving have already run inside the transaction.
        let template = store
            .insert_template(
                user,
                &NewTemplate::new("broken", Horizon::Daily, chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
                day1,
            )
            .unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE recurring_templates SET reminder_time_local = '25:99' WHERE id = ?1",
                params![template.id],
            )
            .unwrap();
        }

        let err = c.reconcile(user, Horizon::Daily, day2).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.task(user, pending.id).unwrap().period_key, "2026-02-20");
        assert_eq!(store.task(user, done.id).unwrap().archived_at, None);
        assert_eq!(
            store.last_observed_key(user, Horizon::Daily).unwrap().as_deref(),
            Some("2026-02-20")
        );

        {
            let conn = store.lock().unwrap();
            conn.execute(
                "UPDATE recurring_templates SET reminder_time_local = NULL WHERE id = ?1",
                params![template.id],
            )
            .unwrap();
        }

        let outcome = c.reconcile(user, Horizon::Daily, day2).unwrap();
        assert!(outcome.did_rollover);
        assert_eq!(outcome.stats.migrated, 1);
        assert_eq!(outcome.stats.archived, 1);
        assert_eq!(outcome.stats.tasks_created, 1);
        assert_eq!(store.task(user, pending.id).unwrap().period_key, "2026-02-21");
        assert_eq!(store.task(user, done.id).unwrap().archived_at, Some(day2));
    }

    #[test]
    fn materialize_rejects_foreign_key() {
        let (c, user) = coordinator();
        let err = c
            .materialize(user, Horizon::Quarterly, "2026-H1", utc("2026-02-21T10:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, PlannerError::InvalidPeriodKey { .. }));
    }
}
