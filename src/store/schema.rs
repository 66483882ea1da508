//! SQLite DDL for the planner store.
//!
//! Dates are `YYYY-MM-DD` text so range predicates compare lexically.
//! Instants are epoch seconds.

use rusqlite::Connection;

/// Complete DDL for the planner database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    timezone   TEXT NOT NULL,               -- IANA zone id
    created_at INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0
);

-- Last period key observed per (user, horizon).
CREATE TABLE IF NOT EXISTS planning_state (
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    horizon         TEXT NOT NULL,
    last_period_key TEXT,
    updated_at      INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, horizon)
);

CREATE TABLE IF NOT EXISTS recurring_templates (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id             INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title               TEXT NOT NULL,
    description         TEXT,
    horizon             TEXT NOT NULL,
    priority            TEXT NOT NULL DEFAULT 'MEDIUM',
    is_active           INTEGER NOT NULL DEFAULT 1,
    start_date          TEXT NOT NULL,
    end_date            TEXT,                -- inclusive
    reminder_enabled    INTEGER NOT NULL DEFAULT 0,
    reminder_time_local TEXT,                -- HH:MM[:SS]
    created_at          INTEGER NOT NULL DEFAULT 0,
    updated_at          INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_templates_user_horizon
    ON recurring_templates(user_id, horizon, is_active);

-- No uniqueness on (template_id, period_key): pushed or restored instances
-- may legitimately share a period with a fresh one.
CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    description TEXT,
    horizon     TEXT NOT NULL,
    priority    TEXT NOT NULL DEFAULT 'MEDIUM',
    status      TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'DONE')),
    period_key  TEXT NOT NULL,
    due_at      INTEGER,
    template_id INTEGER REFERENCES recurring_templates(id) ON DELETE SET NULL,
    archived_at INTEGER,
    created_at  INTEGER NOT NULL DEFAULT 0,
    updated_at  INTEGER NOT NULL DEFAULT 0,
    CHECK (archived_at IS NULL OR status = 'DONE')
);

CREATE INDEX IF NOT EXISTS idx_tasks_period   ON tasks(user_id, horizon, period_key, status);
CREATE INDEX IF NOT EXISTS idx_tasks_template ON tasks(user_id, template_id, period_key);
CREATE INDEX IF NOT EXISTS idx_tasks_archived ON tasks(user_id, archived_at);

CREATE TABLE IF NOT EXISTS reminders (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    task_id    INTEGER NOT NULL UNIQUE REFERENCES tasks(id) ON DELETE CASCADE,
    remind_at  INTEGER NOT NULL,
    is_read    INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_reminders_unread ON reminders(user_id, is_read, remind_at);
"#;

/// Apply the full schema to an open connection.
///
/// Safe to call multiple times. Seeds the schema version on a fresh database.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let version_str = super::types::CURRENT_SCHEMA_VERSION.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![version_str],
    )?;

    Ok(())
}

/// Read the schema version, or `None` if it was never recorded.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn apply_schema_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        let tables = table_names(&conn);
        for expected in [
            "planning_state",
            "recurring_templates",
            "reminders",
            "schema_meta",
            "tasks",
            "users",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[test]
    fn apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();
        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(super::super::types::CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn archived_pending_task_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute("INSERT INTO users (timezone) VALUES ('UTC')", [])
            .unwrap();
        let err = conn.execute(
            "INSERT INTO tasks (user_id, title, horizon, status, period_key, archived_at)
             VALUES (1, 'x', 'DAILY', 'PENDING', '2026-01-01', 10)",
            [],
        );
        assert!(err.is_err());
    }

    #[test]
    fn one_reminder_per_task() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (timezone) VALUES ('UTC');
             INSERT INTO tasks (user_id, title, horizon, period_key) VALUES (1, 'x', 'DAILY', '2026-01-01');
             INSERT INTO reminders (user_id, task_id, remind_at) VALUES (1, 1, 100);",
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO reminders (user_id, task_id, remind_at) VALUES (1, 1, 200)",
            [],
        );
        assert!(dup.is_err());
    }
}
