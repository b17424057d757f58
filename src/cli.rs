use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::models::{ChannelKind, DayRecord, Store, SyncStatus, TaskEdit};
use crate::planner::DayKey;
use crate::sync::{self, RemoteBucket, SyncError};
use crate::template;
use crate::utils::{month_name, parse_date, today, weekday_name};

#[derive(Parser)]
#[command(name = "divulga")]
#[command(about = "DivulgaLocal - daily social-media posting planner for the terminal")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Print the checklist for a day
    Show {
        /// Day to show (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Include inactive channels
        #[arg(long)]
        all: bool,
    },
    /// Activate or deactivate a channel for a day
    Toggle {
        /// Channel id or name (fb, ig, wa, olx, tt, ge)
        channel: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Mark a task as done
    Complete {
        /// Task id, e.g. fb-page
        task_id: String,
        /// Mark as not done instead
        #[arg(long)]
        undo: bool,
        #[arg(long)]
        date: Option<String>,
    },
    /// Set one or more text fields of a task
    Set {
        /// Task id, e.g. ig-reels
        task_id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        images: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Upload the whole planner under this device's sync id
    Publish,
    /// Replace local data with the planner stored under a sync id
    Fetch {
        /// Remote sync id, defaults to this device's id
        #[arg(long)]
        id: Option<String>,
    },
    /// Print this device's sync id
    SyncId,
    /// Print the whole planner as JSON
    Export,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("{0}")]
    UnknownChannel(String),
    #[error("Unknown task id '{0}'")]
    UnknownTask(String),
    #[error("Nothing to set: pass --text, --images or --tags")]
    NothingToSet,
    #[error("Sync failed: {}", .0.user_message())]
    SyncError(#[from] SyncError),
    #[error("Failed to serialize: {0}")]
    SerializeError(#[from] serde_json::Error),
}

fn resolve_date(date: Option<String>) -> Result<NaiveDate, CliError> {
    match date {
        Some(date_str) => parse_date(&date_str)
            .map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", date_str, e))),
        None => Ok(today()),
    }
}

fn resolve_task(task_id: &str) -> Result<ChannelKind, CliError> {
    template::channel_for_task(task_id).ok_or_else(|| CliError::UnknownTask(task_id.to_string()))
}

/// "fb-page (Postagem da Página)"
fn task_heading(task_id: &str) -> String {
    match template::task_label(task_id) {
        Some(label) => format!("{} ({})", task_id, label),
        None => task_id.to_string(),
    }
}

/// Render a day as plain text
pub fn format_day(date: NaiveDate, record: &DayRecord, include_inactive: bool) -> String {
    let mut out = String::new();
    let (done, total) = record.progress();
    let _ = writeln!(
        out,
        "{}, {} de {} de {}  ({}/{} done)",
        weekday_name(date),
        chrono::Datelike::day(&date),
        month_name(date),
        chrono::Datelike::year(&date),
        done,
        total
    );

    let mut shown = 0;
    for channel in &record.channels {
        if !channel.active && !include_inactive {
            continue;
        }
        shown += 1;
        let marker = if channel.active { "" } else { " (inactive)" };
        let _ = writeln!(out, "\n{} [{}]{}", channel.name, channel.id, marker);
        for task in &channel.tasks {
            let check = if task.completed { "x" } else { " " };
            let _ = writeln!(out, "  [{}] {} ({})", check, task.label, task.id);
            for (label, value) in [("text", &task.text), ("images", &task.images), ("tags", &task.tags)] {
                if !value.is_empty() {
                    let _ = writeln!(out, "      {}: {}", label, value.replace('\n', "\n        "));
                }
            }
        }
    }

    if shown == 0 {
        out.push_str("\nNothing planned. Activate a channel with `divulga toggle <channel>`.\n");
    }
    out
}

/// Handle the show command
pub fn handle_show(date: Option<String>, all: bool, db: &Database) -> Result<(), CliError> {
    let date = resolve_date(date)?;
    let store = db.load_store()?;
    print!("{}", format_day(date, &store.day(&DayKey::from_date(date)), all));
    Ok(())
}

/// Handle the toggle command
pub fn handle_toggle(channel: String, date: Option<String>, db: &Database) -> Result<bool, CliError> {
    let kind: ChannelKind = channel.parse().map_err(CliError::UnknownChannel)?;
    let key = DayKey::from_date(resolve_date(date)?);

    let mut store = db.load_store()?;
    store.toggle_channel(&key, kind);
    db.save_store(&store)?;

    let active = store.day(&key).channel(kind).is_some_and(|c| c.active);
    println!("{} is now {} for {}", kind.name(), if active { "active" } else { "inactive" }, key);
    Ok(active)
}

/// Handle the complete command
pub fn handle_complete(task_id: String, undo: bool, date: Option<String>, db: &Database) -> Result<(), CliError> {
    let kind = resolve_task(&task_id)?;
    let key = DayKey::from_date(resolve_date(date)?);

    let mut store = db.load_store()?;
    store.update_task(&key, kind, &task_id, TaskEdit::Completed(!undo));
    db.save_store(&store)?;

    println!("{} marked {} for {}", task_heading(&task_id), if undo { "not done" } else { "done" }, key);
    Ok(())
}

/// Handle the set command
pub fn handle_set(
    task_id: String,
    text: Option<String>,
    images: Option<String>,
    tags: Option<String>,
    date: Option<String>,
    db: &Database,
) -> Result<(), CliError> {
    let kind = resolve_task(&task_id)?;
    let key = DayKey::from_date(resolve_date(date)?);

    let edits: Vec<TaskEdit> = [
        text.map(TaskEdit::Text),
        images.map(TaskEdit::Images),
        tags.map(TaskEdit::Tags),
    ]
    .into_iter()
    .flatten()
    .collect();
    if edits.is_empty() {
        return Err(CliError::NothingToSet);
    }

    let mut store = db.load_store()?;
    for edit in edits {
        store.update_task(&key, kind, &task_id, edit);
    }
    db.save_store(&store)?;

    println!("{} updated for {}", task_heading(&task_id), key);
    Ok(())
}

/// Handle the publish command
pub fn handle_publish(db: &Database, bucket: &dyn RemoteBucket) -> Result<(), CliError> {
    let store = db.load_store()?;
    let mut descriptor = db.load_sync_descriptor()?;

    sync::publish(bucket, &descriptor.sync_id, &store)?;

    descriptor.status = SyncStatus::Idle;
    descriptor.last_sync = Some(Utc::now());
    db.save_sync_descriptor(&descriptor)?;
    println!("Published {} day(s) under sync id {}", store.days.len(), descriptor.sync_id);
    Ok(())
}

/// Handle the fetch command. Remote data replaces local data entirely, and
/// a fetched foreign id becomes this device's id.
pub fn handle_fetch(id: Option<String>, db: &Database, bucket: &dyn RemoteBucket) -> Result<Store, CliError> {
    let mut descriptor = db.load_sync_descriptor()?;
    let id = id
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| descriptor.sync_id.clone());

    let store = sync::fetch(bucket, &id)?;

    db.save_store(&store)?;
    descriptor.sync_id = id;
    descriptor.status = SyncStatus::Idle;
    descriptor.last_sync = Some(Utc::now());
    db.save_sync_descriptor(&descriptor)?;
    println!("Fetched {} day(s) from sync id {}", store.days.len(), descriptor.sync_id);
    Ok(store)
}

/// Handle the sync-id command
pub fn handle_sync_id(db: &Database) -> Result<String, CliError> {
    let descriptor = db.load_sync_descriptor()?;
    println!("{}", descriptor.sync_id);
    Ok(descriptor.sync_id)
}

/// Handle the export command
pub fn handle_export(db: &Database) -> Result<(), CliError> {
    let store = db.load_store()?;
    println!("{}", serde_json::to_string_pretty(&store)?);
    Ok(())
}
