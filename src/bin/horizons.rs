//! CLI binary for horizons.
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use horizons::store::{NewTemplate, Priority, parse_time_of_day};
use horizons::{Horizon, PeriodSelector, Planner, PlannerConfig, SqlitePlannerStore, TaskDraft};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// horizons: multi-horizon planner with lazy period rollover.
#[derive(Parser)]
#[command(name = "horizons", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured path.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Evaluate as of this RFC 3339 instant instead of the system clock.
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current period key of a horizon in a zone.
    Key {
        horizon: Horizon,
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },

    /// Create a user.
    UserAdd {
        /// IANA zone; defaults to `planner.default_timezone`.
        #[arg(long)]
        timezone: Option<String>,
    },

    /// Change a user's zone.
    UserTz { user: i64, timezone: String },

    /// Show a user's zone and last observed key per horizon.
    State { user: i64 },

    /// Bring one horizon, or all of them, up to date.
    Reconcile { user: i64, horizon: Option<Horizon> },

    /// List the tasks of a period.
    Tasks {
        user: i64,
        horizon: Horizon,
        /// `current`, `tomorrow`, or a literal period key.
        #[arg(long, default_value = "current")]
        period: PeriodSelector,
    },

    /// Create a task.
    AddTask {
        user: i64,
        horizon: Horizon,
        title: String,
        #[arg(long, default_value = "current")]
        period: PeriodSelector,
        #[arg(long, default_value = "MEDIUM")]
        priority: Priority,
        #[arg(long)]
        description: Option<String>,
    },

    /// Mark a task done.
    Done { user: i64, task: i64 },

    /// Move a task to the next period.
    Push { user: i64, task: i64 },

    /// Bring an archived task back into the current period.
    Restore { user: i64, task: i64 },

    /// Create a recurring template.
    AddTemplate {
        user: i64,
        horizon: Horizon,
        title: String,
        /// First local day the template applies to (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,
        /// Last local day the template applies to, inclusive.
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "MEDIUM")]
        priority: Priority,
        /// Local reminder time (HH:MM[:SS]) on the first day of each period.
        #[arg(long, value_parser = parse_reminder_time)]
        remind_at: Option<NaiveTime>,
        #[arg(long)]
        description: Option<String>,
    },

    /// List a user's templates.
    Templates { user: i64 },

    /// List unread reminders.
    Reminders { user: i64 },

    /// Mark a reminder read.
    ReadReminder { user: i64, reminder: i64 },

    /// List archived tasks.
    Vault {
        user: i64,
        #[arg(long)]
        horizon: Option<Horizon>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if let Some(db) = cli.db {
        config.store.db_path = db;
    }
    let now = cli.now.unwrap_or_else(Utc::now);

    if let Command::Key { horizon, timezone } = &cli.command {
        return print_key(*horizon, timezone, now);
    }

    debug!(db = %config.store.db_path.display(), "opening planner store");
    let store = SqlitePlannerStore::open_with_config(&config.store)
        .with_context(|| format!("opening {}", config.store.db_path.display()))?;
    let planner = Planner::new(Arc::new(store)).with_defaults(config.planner.clone());

    run(&planner, cli.command, now)
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PlannerConfig> {
    match path {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => {
            let default_path = PlannerConfig::default_config_path();
            if default_path.exists() {
                PlannerConfig::from_file(&default_path)
                    .with_context(|| format!("loading config {}", default_path.display()))
            } else {
                Ok(PlannerConfig::default())
            }
        }
    }
}

fn run(planner: &Planner, command: Command, now: DateTime<Utc>) -> anyhow::Result<()> {
    match command {
        Command::Key { horizon, timezone } => print_key(horizon, &timezone, now),
        Command::UserAdd { timezone } => emit(&planner.create_user(timezone.as_deref(), now)?),
        Command::UserTz { user, timezone } => emit(&planner.set_timezone(user, &timezone, now)?),
        Command::State { user } => emit(&planner.store().planning_state(user)?),
        Command::Reconcile { user, horizon } => {
            let horizons = horizon.map_or_else(|| Horizon::ALL.to_vec(), |h| vec![h]);
            let mut outcomes = serde_json::Map::new();
            for horizon in horizons {
                let outcome = planner.reconcile(user, horizon, now)?;
                outcomes.insert(horizon.to_string(), serde_json::to_value(outcome)?);
            }
            emit(&outcomes)
        }
        Command::Tasks {
            user,
            horizon,
            period,
        } => emit(&planner.list_tasks(user, horizon, &period, now)?),
        Command::AddTask {
            user,
            horizon,
            title,
            period,
            priority,
            description,
        } => {
            let draft = TaskDraft {
                description,
                priority,
                period,
                ..TaskDraft::new(title, horizon)
            };
            emit(&planner.create_task(user, draft, now)?)
        }
        Command::Done { user, task } => emit(&planner.complete_task(user, task, now)?),
        Command::Push { user, task } => emit(&planner.push_task(user, task, now)?),
        Command::Restore { user, task } => emit(&planner.restore_task(user, task, now)?),
        Command::AddTemplate {
            user,
            horizon,
            title,
            start,
            end,
            priority,
            remind_at,
            description,
        } => {
            let mut template = NewTemplate::new(title, horizon, start);
            template.end_date = end;
            template.priority = priority;
            template.description = description;
            if let Some(time) = remind_at {
                template = template.with_reminder(time);
            }
            emit(&planner.add_template(user, &template, now)?)
        }
        Command::Templates { user } => emit(&planner.templates(user)?),
        Command::Reminders { user } => emit(&planner.unread_reminders(user)?),
        Command::ReadReminder { user, reminder } => {
            planner.mark_reminder_read(user, reminder)?;
            emit(&json!({ "ok": true, "reminder": reminder }))
        }
        Command::Vault {
            user,
            horizon,
            limit,
            offset,
        } => emit(&planner.vault(user, horizon, limit, offset)?),
    }
}

fn print_key(horizon: Horizon, timezone: &str, now: DateTime<Utc>) -> anyhow::Result<()> {
    let tz = horizons_period::parse_timezone(timezone)?;
    let key = horizons_period::current_period_key(horizon, tz, now);
    emit(&json!({
        "horizon": horizon,
        "timezone": tz.name(),
        "key": key,
        "start": horizons_period::period_start(horizon, &key)?,
        "end_exclusive": horizons_period::period_end_exclusive(horizon, &key)?,
        "previous": horizons_period::previous_period_key(horizon, &key)?,
        "next": horizons_period::next_period_key(horizon, &key)?,
    }))
}

fn parse_reminder_time(s: &str) -> Result<NaiveTime, String> {
    parse_time_of_day(s).map_err(|e| format!("expected HH:MM or HH:MM:SS: {e}"))
}

fn emit<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
