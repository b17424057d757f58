use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::database::DatabaseError;
use crate::models::{ChannelKind, DayRecord, Store, TaskEdit, TextField};
use crate::planner::{self, DayKey};
use crate::sync::{self, RemoteBucket, SyncError, SyncSession};
use crate::tui::widgets::editor::Editor;
use crate::{Config, Database};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Edit,
    Sync,
    Help,
}

/// One focusable task row in the cards of the selected day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTarget {
    pub channel: ChannelKind,
    pub task_id: String,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub mode: Mode,
    pub selected_date: NaiveDate,
    pub today: NaiveDate,
    /// Index into `App::focus_targets()`
    pub cursor: usize,
    pub field: TextField,
    pub card_scroll: usize,
}

/// The field editor popup
#[derive(Debug, Clone)]
pub struct EditState {
    pub channel: ChannelKind,
    pub task_id: String,
    pub task_label: String,
    pub field: TextField,
    pub editor: Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Publish,
    Fetch,
    CopyId,
    Close,
}

impl SyncAction {
    pub const ALL: [SyncAction; 4] = [
        SyncAction::Publish,
        SyncAction::Fetch,
        SyncAction::CopyId,
        SyncAction::Close,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SyncAction::Publish => "Publish this device's data",
            SyncAction::Fetch => "Fetch data (remote ID, or this device's ID)",
            SyncAction::CopyId => "Copy sync ID",
            SyncAction::Close => "Close",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncModalField {
    RemoteId,
    Actions,
}

#[derive(Debug, Clone)]
pub struct SyncModalState {
    pub field: SyncModalField,
    pub action_index: usize,
    pub remote_id: Editor,
}

impl Default for SyncModalState {
    fn default() -> Self {
        Self {
            field: SyncModalField::Actions,
            action_index: 0,
            remote_id: Editor::single_line(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

/// Result of a publish/fetch worker
#[derive(Debug)]
pub enum SyncOutcome {
    Published { id: String },
    Fetched { id: String, store: Store },
    Failed { error: SyncError },
}

pub struct App {
    pub config: Config,
    pub database: Database,

    /// Every edited day; the only source the screen is drawn from
    pub store: Store,
    pub session: SyncSession,
    bucket: Arc<dyn RemoteBucket>,

    pub ui: UiState,
    pub edit: Option<EditState>,
    pub sync_modal: SyncModalState,
    /// Blocking notification; swallows input until dismissed
    pub alert: Option<String>,
    pub status: StatusState,

    jobs_tx: Sender<SyncOutcome>,
    jobs_rx: Receiver<SyncOutcome>,
}

impl App {
    pub fn new(config: Config, database: Database, bucket: Arc<dyn RemoteBucket>) -> Result<Self, DatabaseError> {
        let store = database.load_store()?;
        let descriptor = database.load_sync_descriptor()?;
        let today = crate::utils::today();
        let (jobs_tx, jobs_rx) = mpsc::channel();

        info!(days = store.days.len(), sync_id = %descriptor.sync_id, "planner loaded");

        Ok(Self {
            config,
            database,
            store,
            session: SyncSession::new(descriptor),
            bucket,
            ui: UiState {
                mode: Mode::View,
                selected_date: today,
                today,
                cursor: 0,
                field: TextField::Text,
                card_scroll: 0,
            },
            edit: None,
            sync_modal: SyncModalState::default(),
            alert: None,
            status: StatusState::default(),
            jobs_tx,
            jobs_rx,
        })
    }

    pub fn day_key(&self) -> DayKey {
        DayKey::from_date(self.ui.selected_date)
    }

    /// The selected day's record, seeded from the template if it was never edited
    pub fn current_day(&self) -> Cow<'_, DayRecord> {
        self.store.day(&self.day_key())
    }

    /// Task rows of the active channels, in display order
    pub fn focus_targets(&self) -> Vec<FocusTarget> {
        self.current_day()
            .active_channels()
            .flat_map(|channel| {
                channel.tasks.iter().map(move |task| FocusTarget {
                    channel: channel.id,
                    task_id: task.id.clone(),
                })
            })
            .collect()
    }

    pub fn focused(&self) -> Option<FocusTarget> {
        self.focus_targets().into_iter().nth(self.ui.cursor)
    }

    fn clamp_cursor(&mut self) {
        let count = self.focus_targets().len();
        self.ui.cursor = self.ui.cursor.min(count.saturating_sub(1));
    }

    /// Write the store to local storage. Called after every mutation.
    fn persist(&mut self) {
        if let Err(e) = self.database.save_store(&self.store) {
            error!(error = %e, "failed to save planner");
            self.set_status_message(format!("Failed to save: {}", e));
        }
    }

    fn persist_sync_descriptor(&mut self) {
        if let Err(e) = self.database.save_sync_descriptor(&self.session.descriptor) {
            error!(error = %e, "failed to save sync descriptor");
        }
    }

    // Day navigation

    pub fn select_date(&mut self, date: NaiveDate) {
        if date != self.ui.selected_date {
            self.ui.selected_date = date;
            self.ui.cursor = 0;
            self.ui.card_scroll = 0;
        }
    }

    pub fn select_day_of_month(&mut self, day: u32) {
        self.select_date(planner::with_day(self.ui.selected_date, day));
    }

    pub fn move_day(&mut self, delta: i64) {
        if let Some(date) = self
            .ui
            .selected_date
            .checked_add_signed(ChronoDuration::days(delta))
        {
            self.select_date(date);
        }
    }

    pub fn shift_month(&mut self, months: i32) {
        self.select_date(planner::shift_month(self.ui.selected_date, months));
    }

    pub fn go_today(&mut self) {
        self.ui.today = crate::utils::today();
        self.select_date(self.ui.today);
    }

    // Store mutations

    pub fn toggle_channel(&mut self, kind: ChannelKind) {
        let key = self.day_key();
        self.store.toggle_channel(&key, kind);
        self.persist();
        self.clamp_cursor();
    }

    pub fn toggle_focused_task(&mut self) {
        let Some(target) = self.focused() else {
            return;
        };
        let key = self.day_key();
        self.store.toggle_task(&key, target.channel, &target.task_id);
        self.persist();
    }

    pub fn move_focus_up(&mut self) {
        self.ui.cursor = self.ui.cursor.saturating_sub(1);
    }

    pub fn move_focus_down(&mut self) {
        let count = self.focus_targets().len();
        if self.ui.cursor + 1 < count {
            self.ui.cursor += 1;
        }
    }

    pub fn next_field(&mut self) {
        self.ui.field = self.ui.field.next();
    }

    /// Open the editor popup on the focused task's current field
    pub fn begin_edit(&mut self) {
        let Some(target) = self.focused() else {
            self.set_status_message("Activate a channel (1-6) first".to_string());
            return;
        };
        let field = self.ui.field;
        let day = self.current_day();
        let Some(task) = day
            .channel(target.channel)
            .and_then(|c| c.tasks.iter().find(|t| t.id == target.task_id))
        else {
            return;
        };

        let edit = EditState {
            channel: target.channel,
            task_id: task.id.clone(),
            task_label: task.label.clone(),
            field,
            editor: Editor::from_string(task.field(field).to_string(), field.is_multi_line()),
        };
        drop(day);

        self.edit = Some(edit);
        self.ui.mode = Mode::Edit;
    }

    /// Write the editor's text into the task and close the popup
    pub fn commit_edit(&mut self) {
        if let Some(edit) = self.edit.take() {
            let key = self.day_key();
            let value = edit.editor.to_string();
            self.store
                .update_task(&key, edit.channel, &edit.task_id, TaskEdit::for_field(edit.field, value));
            self.persist();
        }
        self.ui.mode = Mode::View;
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
        self.ui.mode = Mode::View;
    }

    // Remote mirror

    pub fn open_sync_modal(&mut self) {
        self.sync_modal = SyncModalState::default();
        self.ui.mode = Mode::Sync;
    }

    pub fn close_sync_modal(&mut self) {
        self.ui.mode = Mode::View;
    }

    pub fn run_sync_action(&mut self, action: SyncAction) {
        match action {
            SyncAction::Publish => self.start_publish(),
            SyncAction::Fetch => {
                let typed = self.sync_modal.remote_id.to_string().trim().to_string();
                let id = if typed.is_empty() {
                    self.session.descriptor.sync_id.clone()
                } else {
                    typed
                };
                self.start_fetch(id);
            }
            SyncAction::CopyId => {
                let id = self.session.descriptor.sync_id.clone();
                self.copy_to_clipboard(&id, "Sync ID");
            }
            SyncAction::Close => self.close_sync_modal(),
        }
    }

    fn begin_sync(&mut self) {
        self.session.begin();
        self.persist_sync_descriptor();
    }

    /// Upload the whole store on a worker thread
    pub fn start_publish(&mut self) {
        self.begin_sync();
        let bucket = Arc::clone(&self.bucket);
        let tx = self.jobs_tx.clone();
        let id = self.session.descriptor.sync_id.clone();
        let store = self.store.clone();

        std::thread::spawn(move || {
            let outcome = match sync::publish(bucket.as_ref(), &id, &store) {
                Ok(()) => SyncOutcome::Published { id },
                Err(error) => SyncOutcome::Failed { error },
            };
            let _ = tx.send(outcome);
        });
        self.set_status_message("Publishing...".to_string());
    }

    /// Download a store on a worker thread; it replaces local data when it arrives
    pub fn start_fetch(&mut self, id: String) {
        self.begin_sync();
        let bucket = Arc::clone(&self.bucket);
        let tx = self.jobs_tx.clone();

        std::thread::spawn(move || {
            let outcome = match sync::fetch(bucket.as_ref(), &id) {
                Ok(store) => SyncOutcome::Fetched { id, store },
                Err(error) => SyncOutcome::Failed { error },
            };
            let _ = tx.send(outcome);
        });
        self.set_status_message("Fetching...".to_string());
    }

    /// Apply finished publish/fetch results. Returns how many were applied.
    pub fn poll_sync_jobs(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.jobs_rx.try_recv() {
            self.apply_sync_outcome(outcome);
            applied += 1;
        }
        applied
    }

    fn apply_sync_outcome(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Published { id } => {
                self.session.succeed(Utc::now());
                self.set_status_message(format!("Published under {}", id));
            }
            SyncOutcome::Fetched { id, store } => {
                // Last write wins: remote replaces everything local
                self.store = store;
                self.persist();
                self.clamp_cursor();
                if id != self.session.descriptor.sync_id {
                    info!(old = %self.session.descriptor.sync_id, new = %id, "adopted fetched sync id");
                    self.session.descriptor.sync_id = id.clone();
                }
                self.session.succeed(Utc::now());
                self.set_status_message(format!("Fetched data from {}", id));
            }
            SyncOutcome::Failed { error } => {
                warn!(error = %error, "sync failed");
                self.session.fail();
                self.alert = Some(error.user_message());
            }
        }
        self.persist_sync_descriptor();
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    // Clipboard

    pub fn copy_focused_field(&mut self) {
        let Some(target) = self.focused() else {
            return;
        };
        let field = self.ui.field;
        let text = self
            .current_day()
            .channel(target.channel)
            .and_then(|c| c.tasks.iter().find(|t| t.id == target.task_id))
            .map(|t| t.field(field).to_string())
            .unwrap_or_default();
        if text.is_empty() {
            self.set_status_message(format!("{} is empty", field.label()));
            return;
        }
        self.copy_to_clipboard(&text, field.label());
    }

    fn copy_to_clipboard(&mut self, text: &str, what: &str) {
        let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text.to_string()));
        match result {
            Ok(()) => self.set_status_message(format!("{} copied", what)),
            Err(e) => {
                warn!(error = %e, "clipboard unavailable");
                self.set_status_message(format!("Clipboard unavailable: {}", e));
            }
        }
    }

    // Status line and timers

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Once per loop iteration: expire the status line and a settled sync status
    pub fn tick(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }

        let delay = Duration::from_secs(self.config.sync.status_reset_secs);
        if self.session.expire(delay) {
            self.persist_sync_descriptor();
        }
    }
}
