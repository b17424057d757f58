use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};

use crate::Config;
use crate::models::{DayRecord, TextField};
use crate::tui::app::FocusTarget;
use crate::tui::widgets::color::{channel_accent, get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;

/// Cards for the active channels of a day
pub fn render_channel_cards(
    f: &mut Frame,
    area: Rect,
    day: &DayRecord,
    focus: Option<&FocusTarget>,
    field: TextField,
    scroll: &mut usize,
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let muted = parse_color(&active_theme.muted);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = parse_color(&active_theme.highlight_fg);

    let (done, total) = day.progress();
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Planejamento")
        .title_bottom(Line::from(format!(" {}/{} ", done, total)).alignment(Alignment::Right))
        .border_style(Style::default().fg(muted))
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if day.active_channels().next().is_none() {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Nada planejado para hoje?",
                Style::default().fg(fg_color).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Selecione os canais que você pretende utilizar hoje (1-6) para começar.",
                Style::default().fg(muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(ratatui::widgets::Wrap { trim: true });
        f.render_widget(paragraph, inner);
        *scroll = 0;
        return;
    }

    let width = inner.width as usize;
    let palette = Palette {
        fg: fg_color,
        muted,
        highlight_fg,
        highlight_bg,
    };
    let (lines, focus_line) = build_lines(day, focus, field, width, &palette);

    let viewport = inner.height as usize;
    *scroll = scroll_to_show(*scroll, focus_line, viewport, lines.len());

    let total_lines = lines.len();
    let paragraph = Paragraph::new(lines).scroll((*scroll as u16, 0));
    f.render_widget(paragraph, inner);

    if total_lines > viewport {
        let mut state = ScrollbarState::new(total_lines.saturating_sub(viewport)).position(*scroll);
        f.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

struct Palette {
    fg: Color,
    muted: Color,
    highlight_fg: Color,
    highlight_bg: Color,
}

/// Card lines plus the index of the focused task's first line
fn build_lines(
    day: &DayRecord,
    focus: Option<&FocusTarget>,
    field: TextField,
    width: usize,
    palette: &Palette,
) -> (Vec<Line<'static>>, Option<usize>) {
    let mut lines = Vec::new();
    let mut focus_line = None;

    for channel in day.active_channels() {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        let accent = channel_accent(channel.id);
        let header = format!(" {} · {} TAREFAS ", channel.name.to_uppercase(), channel.tasks.len());
        lines.push(Line::from(Span::styled(
            format!("{:<width$}", truncate(&header, width), width = width),
            Style::default()
                .fg(get_contrast_text_color(accent))
                .bg(accent)
                .add_modifier(Modifier::BOLD),
        )));

        for task in &channel.tasks {
            let focused = focus.is_some_and(|f| f.channel == channel.id && f.task_id == task.id);
            if focused {
                focus_line = Some(lines.len());
            }

            let check = if task.completed { "[x]" } else { "[ ]" };
            let mut title_style = Style::default().fg(palette.fg).add_modifier(Modifier::BOLD);
            if task.completed {
                title_style = title_style.fg(palette.muted).add_modifier(Modifier::CROSSED_OUT);
            }
            let pointer = if focused { "›" } else { " " };
            lines.push(Line::from(vec![
                Span::styled(format!("{} {} ", pointer, check), Style::default().fg(channel_accent(channel.id))),
                Span::styled(truncate(&task.label, width.saturating_sub(6)), title_style),
            ]));

            for text_field in TextField::ALL {
                let value = task.field(text_field);
                let label = format!("    {:<8}", format!("{}:", text_field.label()));
                let room = width.saturating_sub(label.chars().count());
                let (content, mut style) = match value.lines().next().filter(|l| !l.is_empty()) {
                    Some(first) => {
                        let more = if value.lines().nth(1).is_some() { " ↵" } else { "" };
                        (
                            truncate(&format!("{}{}", first, more), room),
                            Style::default().fg(palette.fg),
                        )
                    }
                    None => (
                        truncate(text_field.placeholder(), room),
                        Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
                    ),
                };
                let mut label_style = Style::default().fg(palette.muted);
                if focused && text_field == field {
                    style = style.fg(palette.highlight_fg).bg(palette.highlight_bg);
                    label_style = label_style.fg(palette.highlight_fg).bg(palette.highlight_bg);
                }
                lines.push(Line::from(vec![
                    Span::styled(label, label_style),
                    Span::styled(content, style),
                ]));
            }
        }
    }

    (lines, focus_line)
}

/// Adjust `scroll` so the focused task (title plus its three fields) is in view
pub fn scroll_to_show(scroll: usize, focus_line: Option<usize>, viewport: usize, total: usize) -> usize {
    let max_scroll = total.saturating_sub(viewport);
    let Some(line) = focus_line else {
        return scroll.min(max_scroll);
    };
    let block_end = line + 1 + TextField::ALL.len();
    let scroll = if line < scroll {
        line
    } else if block_end > scroll + viewport {
        block_end.saturating_sub(viewport).min(line)
    } else {
        scroll
    };
    scroll.min(max_scroll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelKind, TaskEdit};
    use crate::planner::DayKey;
    use crate::models::Store;
    use chrono::NaiveDate;

    fn palette() -> Palette {
        Palette {
            fg: Color::White,
            muted: Color::DarkGray,
            highlight_fg: Color::Black,
            highlight_bg: Color::Cyan,
        }
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn cards_list_header_tasks_and_fields() {
        let mut store = Store::default();
        let key = DayKey::from_date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        store.toggle_channel(&key, ChannelKind::TikTok);
        store.update_task(&key, ChannelKind::TikTok, "tt-auction", TaskEdit::Text("Lote 12\nlance mínimo".into()));
        let day = store.day(&key);

        let focus = FocusTarget {
            channel: ChannelKind::TikTok,
            task_id: "tt-auction".to_string(),
        };
        let (lines, focus_line) = build_lines(&day, Some(&focus), TextField::Text, 60, &palette());
        let texts: Vec<String> = lines.iter().map(line_text).collect();

        assert!(texts[0].starts_with(" TIKTOK · 2 TAREFAS"));
        assert_eq!(lines.len(), 1 + 2 * 4);
        assert_eq!(focus_line, Some(5));
        assert!(texts[5].starts_with("› [ ] Leilão"));
        assert!(texts[6].contains("Lote 12 ↵"));
        assert!(texts[2].contains(TextField::Text.placeholder()));
    }

    #[test]
    fn scroll_keeps_focused_block_visible() {
        // Block of 4 lines starting at 10, viewport 6
        assert_eq!(scroll_to_show(0, Some(10), 6, 30), 8);
        assert_eq!(scroll_to_show(12, Some(10), 6, 30), 10);
        assert_eq!(scroll_to_show(9, Some(10), 6, 30), 9);
        assert_eq!(scroll_to_show(20, None, 6, 12), 6);
    }
}
