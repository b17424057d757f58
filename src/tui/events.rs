use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size as terminal_size,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io;
use tracing::info;

use crate::models::ChannelKind;
use crate::tui::App;
use crate::tui::app::{Mode, SyncAction, SyncModalField};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{ParsedKeyBinding, has_primary_modifier, parse_key_binding};

/// Restores the terminal when dropped, panics included. A terminal left in
/// raw mode or on the alternate screen is unusable.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore on normal exit; drop becomes a no-op afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Checked before the alternate screen so the message lands in the normal terminal
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::TerminalTooSmall(format!(
            "Current: {}x{}, minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width, min_height
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    info!("tui started");

    loop {
        app.poll_sync_jobs();
        app.tick();

        let size = terminal.size()?;
        let rect = Rect::new(0, 0, size.width, size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(rect);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        // Only Press events; Windows also reports releases
        if event::poll(std::time::Duration::from_millis(16))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                    break;
                }
            }
        }
    }

    guard.restore()?;
    info!("tui stopped");
    Ok(())
}

fn binding(key_str: &str) -> Result<ParsedKeyBinding, TuiError> {
    parse_key_binding(key_str).map_err(TuiError::KeyBindingError)
}

fn matches(key_event: KeyEvent, key_str: &str) -> Result<bool, TuiError> {
    Ok(matches_key_event(key_event, &binding(key_str)?))
}

/// Returns true when the user asked to quit
fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    // A pending alert swallows input until dismissed
    if app.alert.is_some() {
        if matches!(key_event.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_alert();
        }
        return Ok(false);
    }

    match app.ui.mode {
        Mode::View => handle_view_mode(app, key_event),
        Mode::Edit => handle_edit_mode(app, key_event).map(|_| false),
        Mode::Sync => handle_sync_mode(app, key_event).map(|_| false),
        Mode::Help => {
            let kb = &app.config.key_bindings;
            if key_event.code == KeyCode::Esc || matches(key_event, &kb.help)? || matches(key_event, &kb.quit)? {
                app.ui.mode = Mode::View;
            }
            Ok(false)
        }
    }
}

fn handle_view_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let kb = app.config.key_bindings.clone();

    if matches(key_event, &kb.quit)? {
        return Ok(true);
    }
    if matches(key_event, &kb.help)? {
        app.ui.mode = Mode::Help;
    } else if matches(key_event, &kb.sync)? {
        app.open_sync_modal();
    } else if matches(key_event, &kb.prev_day)? {
        app.move_day(-1);
    } else if matches(key_event, &kb.next_day)? {
        app.move_day(1);
    } else if matches(key_event, &kb.prev_month)? {
        app.shift_month(-1);
    } else if matches(key_event, &kb.next_month)? {
        app.shift_month(1);
    } else if matches(key_event, &kb.today)? {
        app.go_today();
    } else if matches(key_event, &kb.list_up)? || key_event.code == KeyCode::Up {
        app.move_focus_up();
    } else if matches(key_event, &kb.list_down)? || key_event.code == KeyCode::Down {
        app.move_focus_down();
    } else if matches(key_event, &kb.toggle_completed)? {
        app.toggle_focused_task();
    } else if matches(key_event, &kb.next_field)? {
        app.next_field();
    } else if matches(key_event, &kb.edit)? {
        app.begin_edit();
    } else if matches(key_event, &kb.copy)? {
        app.copy_focused_field();
    } else if let KeyCode::Char(c) = key_event.code {
        // 1-6 toggle channels in display order
        if let Some(kind) = c
            .to_digit(10)
            .and_then(|d| (d as usize).checked_sub(1))
            .and_then(ChannelKind::from_index)
        {
            app.toggle_channel(kind);
        }
    }
    Ok(false)
}

fn handle_edit_mode(app: &mut App, key_event: KeyEvent) -> Result<(), TuiError> {
    let kb = app.config.key_bindings.clone();

    if key_event.code == KeyCode::Esc {
        app.cancel_edit();
        return Ok(());
    }
    if matches(key_event, &kb.save)? {
        app.commit_edit();
        return Ok(());
    }

    let Some(edit) = app.edit.as_mut() else {
        app.ui.mode = Mode::View;
        return Ok(());
    };
    let editor = &mut edit.editor;

    if matches(key_event, &kb.undo)? {
        editor.undo();
        return Ok(());
    }
    if matches(key_event, &kb.word_left)? {
        editor.move_cursor_word_left();
        return Ok(());
    }
    if matches(key_event, &kb.word_right)? {
        editor.move_cursor_word_right();
        return Ok(());
    }

    match key_event.code {
        KeyCode::Enter => {
            if editor.multi_line {
                editor.insert_newline();
            } else {
                app.commit_edit();
            }
        }
        KeyCode::Up => editor.move_cursor_up(),
        KeyCode::Down => editor.move_cursor_down(),
        KeyCode::Left => editor.move_cursor_left(),
        KeyCode::Right => editor.move_cursor_right(),
        KeyCode::Home => editor.move_cursor_home(),
        KeyCode::End => editor.move_cursor_end(),
        KeyCode::Backspace => editor.delete_char(),
        KeyCode::Delete => editor.delete_forward(),
        KeyCode::Tab if editor.multi_line => {
            for _ in 0..4 {
                editor.insert_char(' ');
            }
        }
        KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => editor.insert_char(c),
        _ => {}
    }
    Ok(())
}

fn handle_sync_mode(app: &mut App, key_event: KeyEvent) -> Result<(), TuiError> {
    match key_event.code {
        KeyCode::Esc => {
            app.close_sync_modal();
            return Ok(());
        }
        KeyCode::Tab | KeyCode::BackTab => {
            app.sync_modal.field = match app.sync_modal.field {
                SyncModalField::RemoteId => SyncModalField::Actions,
                SyncModalField::Actions => SyncModalField::RemoteId,
            };
            return Ok(());
        }
        _ => {}
    }

    match app.sync_modal.field {
        SyncModalField::RemoteId => {
            let editor = &mut app.sync_modal.remote_id;
            match key_event.code {
                KeyCode::Enter => app.sync_modal.field = SyncModalField::Actions,
                KeyCode::Left => editor.move_cursor_left(),
                KeyCode::Right => editor.move_cursor_right(),
                KeyCode::Home => editor.move_cursor_home(),
                KeyCode::End => editor.move_cursor_end(),
                KeyCode::Backspace => editor.delete_char(),
                KeyCode::Delete => editor.delete_forward(),
                KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => editor.insert_char(c),
                _ => {}
            }
        }
        SyncModalField::Actions => {
            let count = SyncAction::ALL.len();
            let kb = &app.config.key_bindings;
            if key_event.code == KeyCode::Up || matches(key_event, &kb.list_up)? {
                app.sync_modal.action_index = (app.sync_modal.action_index + count - 1) % count;
            } else if key_event.code == KeyCode::Down || matches(key_event, &kb.list_down)? {
                app.sync_modal.action_index = (app.sync_modal.action_index + 1) % count;
            } else if key_event.code == KeyCode::Enter {
                let action = SyncAction::ALL[app.sync_modal.action_index];
                app.run_sync_action(action);
            }
        }
    }
    Ok(())
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Primary modifier is Ctrl on Windows/Linux, Ctrl or Option on macOS
    if binding.requires_ctrl != has_primary_modifier(key_event.modifiers) {
        return false;
    }
    binding.key_code == key_event.code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::tests::MemoryBucket;
    use crate::{Config, Database};
    use chrono::NaiveDate;
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;

    fn app() -> App {
        let mut app = App::new(
            Config::default(),
            Database::in_memory().unwrap(),
            Arc::new(MemoryBucket::default()),
        )
        .unwrap();
        app.select_date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        app
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn ctrl(app: &mut App, c: char) -> bool {
        handle_key_event(app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)).unwrap()
    }

    #[test]
    fn quit_key_ends_loop() {
        let mut app = app();
        assert!(!press(&mut app, KeyCode::Char('j')));
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn digits_toggle_channels() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('6'));
        press(&mut app, KeyCode::Char('7'));
        let active: Vec<_> = app.current_day().active_channels().map(|c| c.id).collect();
        assert_eq!(active, vec![ChannelKind::Instagram, ChannelKind::GoogleBusiness]);
    }

    #[test]
    fn typing_into_text_field_keeps_newlines_until_save() {
        let mut app = app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ui.mode, Mode::Edit);
        for c in "Oi".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('!'));
        ctrl(&mut app, 's');

        assert_eq!(app.ui.mode, Mode::View);
        let day = app.current_day();
        assert_eq!(day.channel(ChannelKind::WhatsApp).unwrap().tasks[0].text, "Oi\n!");
    }

    #[test]
    fn enter_saves_single_line_fields() {
        let mut app = app();
        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ui.mode, Mode::View);
        let day = app.current_day();
        assert_eq!(day.channel(ChannelKind::Olx).unwrap().tasks[0].images, "x");
    }

    #[test]
    fn space_marks_focused_task_done() {
        let mut app = app();
        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char(' '));
        let day = app.current_day();
        let tasks = &day.channel(ChannelKind::Facebook).unwrap().tasks;
        assert!(!tasks[0].completed);
        assert!(tasks[1].completed);
    }

    #[test]
    fn alert_swallows_keys_until_dismissed() {
        let mut app = app();
        app.alert = Some("boom".to_string());
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(app.alert.is_some());
        press(&mut app, KeyCode::Enter);
        assert!(app.alert.is_none());
    }

    #[test]
    fn sync_modal_closes_from_action_list() {
        let mut app = app();
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.ui.mode, Mode::Sync);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.sync_modal.action_index, SyncAction::ALL.len() - 1);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ui.mode, Mode::View);
    }

    #[test]
    fn sync_modal_remote_id_accepts_text() {
        let mut app = app();
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Tab);
        for c in "ab12".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.sync_modal.remote_id.to_string(), "ab1");
        // 'q' is text here, not quit
        assert!(!press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn invalid_binding_is_reported() {
        let mut app = app();
        app.config.key_bindings.quit = "Hyper+q".to_string();
        let result = handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(matches!(result, Err(TuiError::KeyBindingError(_))));
    }
}
