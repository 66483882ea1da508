//! Record types for the planner store.
//!
//! Timestamps are UTC instants (stored as epoch seconds). Template dates are
//! calendar days in the owning user's zone.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use horizons_period::{Horizon, Tz};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Done,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Done => "DONE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

/// A token that names none of an enum's variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "DONE" => Ok(Self::Done),
            _ => Err(UnknownVariant {
                kind: "task status",
                value: s.to_owned(),
            }),
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            _ => Err(UnknownVariant {
                kind: "priority",
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    /// IANA zone identifier.
    pub timezone: String,
}

impl UserRecord {
    /// The user's zone.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimezone` if the stored identifier is not a known zone.
    pub fn tz(&self) -> Result<Tz> {
        Ok(horizons_period::parse_timezone(&self.timezone)?)
    }
}

/// A user's zone together with the last period key observed per horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningState {
    pub user_id: i64,
    pub timezone: String,
    /// Horizons that have never been reconciled are absent.
    pub last_observed: BTreeMap<Horizon, String>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub horizon: Horizon,
    pub priority: Priority,
    pub status: TaskStatus,
    pub period_key: String,
    pub due_at: Option<DateTime<Utc>>,
    /// Originating recurring template; a lookup, not ownership.
    pub template_id: Option<i64>,
    /// Set only on `DONE` tasks.
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Fields for inserting a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub horizon: Horizon,
    pub priority: Priority,
    pub period_key: String,
    pub due_at: Option<DateTime<Utc>>,
}

impl NewTask {
    /// A medium-priority task with no description or due date.
    pub fn new(title: impl Into<String>, horizon: Horizon, period_key: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            horizon,
            priority: Priority::default(),
            period_key: period_key.into(),
            due_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Recurring templates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub horizon: Horizon,
    pub priority: Priority,
    pub is_active: bool,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: Option<NaiveDate>,
    pub reminder_enabled: bool,
    pub reminder_time_local: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringTemplate {
    /// Local reminder time, if reminders are enabled and a time is set.
    #[must_use]
    pub fn reminder_time(&self) -> Option<NaiveTime> {
        self.reminder_time_local.filter(|_| self.reminder_enabled)
    }

    /// The task this template materializes into for `period_key`.
    #[must_use]
    pub fn instance_for(&self, period_key: &str) -> NewTask {
        NewTask {
            title: self.title.clone(),
            description: self.description.clone(),
            horizon: self.horizon,
            priority: self.priority,
            period_key: period_key.to_owned(),
            due_at: None,
        }
    }
}

/// Fields for inserting a recurring template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTemplate {
    pub title: String,
    pub description: Option<String>,
    pub horizon: Horizon,
    pub priority: Priority,
    pub is_active: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub reminder_enabled: bool,
    pub reminder_time_local: Option<NaiveTime>,
}

impl NewTemplate {
    /// An active, open-ended template without a reminder.
    pub fn new(title: impl Into<String>, horizon: Horizon, start_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            horizon,
            priority: Priority::default(),
            is_active: true,
            start_date,
            end_date: None,
            reminder_enabled: false,
            reminder_time_local: None,
        }
    }

    /// Enable a reminder at `time` local on the first day of each period.
    #[must_use]
    pub fn with_reminder(mut self, time: NaiveTime) -> Self {
        self.reminder_enabled = true;
        self.reminder_time_local = Some(time);
        self
    }
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub task_id: i64,
    pub remind_at: DateTime<Utc>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// An unread reminder joined with the task it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueReminder {
    pub id: i64,
    pub task_id: i64,
    pub remind_at: DateTime<Utc>,
    pub title: String,
    pub horizon: Horizon,
    pub period_key: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a local time of day written `HH:MM:SS` or `HH:MM`.
///
/// # Errors
///
/// Returns the `chrono` parse error when neither form matches.
pub fn parse_time_of_day(s: &str) -> std::result::Result<NaiveTime, chrono::ParseError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
}

pub(crate) fn format_time_of_day(t: NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}

pub(crate) fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn to_epoch(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

pub(crate) fn from_epoch(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn template(start: NaiveDate) -> RecurringTemplate {
        let epoch = from_epoch(0).unwrap();
        RecurringTemplate {
            id: 1,
            user_id: 1,
            title: "Review goals".into(),
            description: Some("weekly review".into()),
            horizon: Horizon::Weekly,
            priority: Priority::High,
            is_active: true,
            start_date: start,
            end_date: None,
            reminder_enabled: false,
            reminder_time_local: None,
            created_at: epoch,
            updated_at: epoch,
        }
    }

    #[test]
    fn reminder_time_requires_enabled_flag() {
        let mut t = template(ymd(2026, 1, 1));
        t.reminder_time_local = NaiveTime::from_hms_opt(7, 30, 0);
        assert_eq!(t.reminder_time(), None);
        t.reminder_enabled = true;
        assert_eq!(t.reminder_time(), NaiveTime::from_hms_opt(7, 30, 0));
    }

    #[test]
    fn instance_copies_template_fields() {
        let t = template(ymd(2026, 1, 1));
        let task = t.instance_for("2026-W08");
        assert_eq!(task.title, "Review goals");
        assert_eq!(task.description.as_deref(), Some("weekly review"));
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.horizon, Horizon::Weekly);
        assert_eq!(task.period_key, "2026-W08");
    }

    #[test]
    fn time_of_day_accepts_both_forms() {
        assert_eq!(parse_time_of_day("07:30:00").ok(), NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(parse_time_of_day("07:30").ok(), NaiveTime::from_hms_opt(7, 30, 0));
        assert!(parse_time_of_day("25:99").is_err());
        assert!(parse_time_of_day("noon").is_err());
    }

    #[test]
    fn priority_and_status_parse_case_insensitively() {
        assert_eq!("urgent".parse::<Priority>(), Ok(Priority::Urgent));
        assert_eq!("Done".parse::<TaskStatus>(), Ok(TaskStatus::Done));
        let err = "SOMEDAY".parse::<Priority>().unwrap_err();
        assert_eq!(err.to_string(), "unknown priority: SOMEDAY");
    }

    #[test]
    fn priorities_order_low_to_urgent() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Urgent);
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
