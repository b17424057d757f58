use chrono::{Datelike, NaiveDate};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use std::ops::RangeInclusive;

use crate::Config;
use crate::models::Store;
use crate::planner::{self, DayKey};
use crate::tui::widgets::color::parse_color;

const CELL_WIDTH: u16 = 4;

/// Horizontal strip of the selected month's days
pub fn render_day_strip(f: &mut Frame, area: Rect, selected: NaiveDate, today: NaiveDate, store: &Store, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let muted = parse_color(&active_theme.muted);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = parse_color(&active_theme.highlight_fg);

    let inner_width = area.width.saturating_sub(2);
    let capacity = (inner_width / CELL_WIDTH).max(1) as u32;
    let days = visible_days(selected.day(), planner::days_in_month(selected), capacity);

    let mut spans = Vec::new();
    if *days.start() > 1 {
        spans.push(Span::styled("‹", Style::default().fg(muted)));
    }
    for day in days.clone() {
        let date = planner::with_day(selected, day);
        let planned = store
            .days
            .get(DayKey::from_date(date).as_str())
            .is_some_and(|record| record.active_channels().next().is_some());

        let mut style = if day == selected.day() {
            Style::default().fg(highlight_fg).bg(highlight_bg).add_modifier(Modifier::BOLD)
        } else if planned {
            Style::default().fg(fg_color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(muted)
        };
        if date == today {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        let marker = if planned { "•" } else { " " };
        spans.push(Span::styled(format!("{:>2}{} ", day, marker), style));
    }
    if *days.end() < planner::days_in_month(selected) {
        spans.push(Span::styled("›", Style::default().fg(muted)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(muted))
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color));

    f.render_widget(paragraph, area);
}

/// Days to show when only `capacity` cells fit, keeping `selected` near the middle
pub fn visible_days(selected: u32, days_in_month: u32, capacity: u32) -> RangeInclusive<u32> {
    // One cell each side is reserved for the scroll arrows
    let capacity = if capacity >= days_in_month { days_in_month } else { capacity.saturating_sub(1).max(1) };
    let half = capacity / 2;
    let start = selected
        .saturating_sub(half)
        .max(1)
        .min(days_in_month + 1 - capacity);
    start..=start + capacity - 1
}
