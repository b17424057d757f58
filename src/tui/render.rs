use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout as RatLayout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::app::Mode;
use crate::tui::widgets::{
    alert::render_alert,
    channel_bar::render_channel_bar,
    channel_cards::render_channel_cards,
    color::{parse_color, sync_status_color},
    day_strip::render_day_strip,
    field_editor::render_field_editor,
    help::render_help,
    status_bar::render_status_bar,
    sync_modal::render_sync_modal,
};
use crate::tui::{App, Layout};
use crate::utils::{format_key_binding_for_display as key, month_name, weekday_name};

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let muted = parse_color(&active_theme.muted);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("DIVULGALOCAL")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    // Header: selected date on the left, sync id and status on the right
    let date = app.ui.selected_date;
    let [date_area, sync_area] =
        RatLayout::horizontal([Constraint::Min(1), Constraint::Length(24)]).areas(layout.header_area);
    let mut date_spans = vec![Span::styled(
        format!("{}, {} de {} de {}", weekday_name(date), date.format("%d"), month_name(date), date.format("%Y")),
        Style::default().fg(fg_color).add_modifier(Modifier::BOLD),
    )];
    if date == app.ui.today {
        date_spans.push(Span::styled("  (hoje)", Style::default().fg(muted)));
    }
    f.render_widget(Paragraph::new(Line::from(date_spans)), date_area);

    let status = app.session.status();
    let sync_line = Line::from(vec![
        Span::styled(format!("ID {} ", app.session.descriptor.sync_id), Style::default().fg(muted)),
        Span::styled("●", Style::default().fg(sync_status_color(status))),
    ])
    .alignment(Alignment::Right);
    f.render_widget(Paragraph::new(sync_line), sync_area);

    render_day_strip(f, layout.days_area, date, app.ui.today, &app.store, &app.config);

    let day = app.current_day().into_owned();
    render_channel_bar(f, layout.channels_area, &day, &app.config);

    let focus = app.focused();
    render_channel_cards(
        f,
        layout.main_area,
        &day,
        focus.as_ref(),
        app.ui.field,
        &mut app.ui.card_scroll,
        &app.config,
    );

    let key_hints = get_key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_deref(), &key_hints, &app.config);

    // Overlays, topmost last
    match app.ui.mode {
        Mode::Edit => {
            if let Some(edit) = app.edit.as_mut() {
                render_field_editor(f, layout.inner_area, edit, &app.config);
            }
        }
        Mode::Sync => {
            render_sync_modal(f, layout.inner_area, &app.session.descriptor, &mut app.sync_modal, &app.config);
        }
        Mode::Help => render_help(f, layout.inner_area, &app.config),
        Mode::View => {}
    }
    if let Some(message) = app.alert.as_deref() {
        render_alert(f, layout.inner_area, message, &app.config);
    }
}

fn get_key_hints(app: &App) -> Vec<String> {
    let kb = &app.config.key_bindings;
    if app.alert.is_some() {
        return vec!["Enter: Continue".to_string()];
    }
    match app.ui.mode {
        Mode::Help => vec![format!("Esc or {}: Exit help", key(&kb.help))],
        Mode::Edit => vec![
            format!("{}: Save", key(&kb.save)),
            "Esc: Cancel".to_string(),
            format!("{}: Undo", key(&kb.undo)),
        ],
        Mode::Sync => vec![
            "Tab: Switch".to_string(),
            "Enter: Run".to_string(),
            "Esc: Close".to_string(),
        ],
        Mode::View => vec![
            "1-6: Channels".to_string(),
            format!("{}/{}: Day", key(&kb.prev_day), key(&kb.next_day)),
            format!("{}: Edit", key(&kb.edit)),
            format!("{}: Field", key(&kb.next_field)),
            format!("{}: Done", key(&kb.toggle_completed)),
            format!("{}: Sync", key(&kb.sync)),
            format!("{}: Help", key(&kb.help)),
            format!("{}: Quit", key(&kb.quit)),
        ],
    }
}
