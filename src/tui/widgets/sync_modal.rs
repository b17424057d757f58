use chrono::{DateTime, Local, Utc};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::models::{SyncDescriptor, SyncStatus};
use crate::tui::app::{SyncAction, SyncModalField, SyncModalState};
use crate::tui::widgets::color::{parse_color, sync_status_color};
use crate::tui::widgets::popup_area_fixed;

pub fn render_sync_modal(
    f: &mut Frame,
    area: Rect,
    descriptor: &SyncDescriptor,
    modal: &mut SyncModalState,
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let muted = parse_color(&active_theme.muted);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = parse_color(&active_theme.highlight_fg);

    let popup_area = popup_area_fixed(area, 60, 16);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Sync between devices")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let [info_area, input_area, actions_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Min(1),
    ])
    .areas(inner);

    let label = Style::default().fg(muted);
    let info = vec![
        Line::from(vec![
            Span::styled("This device's ID: ", label),
            Span::styled(
                descriptor.sync_id.clone(),
                Style::default().fg(fg_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Last sync: ", label),
            Span::raw(format_last_sync(descriptor.last_sync)),
        ]),
        Line::from(vec![
            Span::styled("Status: ", label),
            Span::styled(
                status_text(descriptor.status),
                Style::default().fg(sync_status_color(descriptor.status)),
            ),
        ]),
    ];
    f.render_widget(Paragraph::new(info), info_area);

    // Remote id input
    let input_focused = modal.field == SyncModalField::RemoteId;
    let border = if input_focused { highlight_bg } else { muted };
    let inner_width = input_area.width.saturating_sub(2) as usize;
    modal.remote_id.update_scroll(1, inner_width);
    let input_line = if modal.remote_id.is_empty() {
        Line::from(Span::styled(
            "ID from the other device (empty: this device)",
            Style::default().fg(muted).add_modifier(Modifier::ITALIC),
        ))
    } else {
        Line::from(modal.remote_id.visible_lines(1, inner_width).concat())
    };
    f.render_widget(
        Paragraph::new(input_line).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Remote ID")
                .border_style(Style::default().fg(border)),
        ),
        input_area,
    );
    if input_focused {
        if let Some(pos) = modal.remote_id.cursor_screen_pos(input_area) {
            f.set_cursor_position(pos);
        }
    }

    let mut actions: Vec<Line> = Vec::new();
    for (index, action) in SyncAction::ALL.iter().enumerate() {
        let selected = !input_focused && index == modal.action_index;
        let prefix = if selected { "> " } else { "  " };
        let style = if selected {
            Style::default().fg(highlight_fg).bg(highlight_bg)
        } else {
            Style::default().fg(fg_color)
        };
        actions.push(Line::from(Span::styled(format!("{}{}", prefix, action.label()), style)));
    }
    actions.push(Line::from(""));
    actions.push(Line::from(Span::styled(
        "Tab: switch • ↑↓: choose • Enter: run • Esc: close",
        Style::default().fg(muted),
    )));
    f.render_widget(Paragraph::new(actions), actions_area);
}

fn format_last_sync(last_sync: Option<DateTime<Utc>>) -> String {
    match last_sync {
        Some(at) => at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string(),
        None => "never".to_string(),
    }
}

fn status_text(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Idle => "idle",
        SyncStatus::Syncing => "syncing...",
        SyncStatus::Success => "synced",
        SyncStatus::Error => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_synced_reads_never() {
        assert_eq!(format_last_sync(None), "never");
        assert_eq!(status_text(SyncStatus::Syncing), "syncing...");
    }
}
