use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::tui::app::EditState;
use crate::tui::widgets::color::{channel_accent, parse_color};
use crate::tui::widgets::{popup_area, popup_area_fixed};

/// Popup editing one text field of one task
pub fn render_field_editor(f: &mut Frame, area: Rect, edit: &mut EditState, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let muted = parse_color(&active_theme.muted);
    let accent = channel_accent(edit.channel);

    let popup_area = if edit.field.is_multi_line() {
        popup_area(area, 70, 60)
    } else {
        popup_area_fixed(area, 70, 3)
    };
    f.render_widget(Clear, popup_area);

    let inner_height = popup_area.height.saturating_sub(2) as usize;
    let inner_width = popup_area.width.saturating_sub(2) as usize;
    edit.editor.update_scroll(inner_height, inner_width);

    let lines: Vec<Line> = if edit.editor.is_empty() {
        vec![Line::from(Span::styled(
            edit.field.placeholder(),
            Style::default().fg(muted).add_modifier(Modifier::ITALIC),
        ))]
    } else {
        edit.editor
            .visible_lines(inner_height, inner_width)
            .into_iter()
            .map(Line::from)
            .collect()
    };

    let title = format!(" {} · {} · {} ", edit.channel.name(), edit.task_label, edit.field.label());
    let save = crate::utils::format_key_binding_for_display(&config.key_bindings.save);
    let hint = format!(" {}: Save • Esc: Cancel ", save);

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(title, Style::default().fg(accent).add_modifier(Modifier::BOLD)))
            .title_bottom(Line::from(Span::styled(hint, Style::default().fg(muted))).alignment(Alignment::Right))
            .border_style(Style::default().fg(accent))
            .style(Style::default().fg(fg_color).bg(bg_color)),
    );
    f.render_widget(paragraph, popup_area);

    if let Some((x, y)) = edit.editor.cursor_screen_pos(popup_area) {
        f.set_cursor_position((x, y));
    }
}
