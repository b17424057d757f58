use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::Config;
use crate::models::{ChannelKind, DayRecord};
use crate::tui::widgets::color::{channel_accent, get_contrast_text_color, parse_color};

/// Toggle row: one numbered chip per channel, filled with its accent when active
pub fn render_channel_bar(f: &mut Frame, area: Rect, day: &DayRecord, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let muted = parse_color(&active_theme.muted);

    // Full names only when all six fit
    let inner_width = area.width.saturating_sub(2) as usize;
    let full_width: usize = ChannelKind::ALL.iter().map(|k| chip_label(*k, false).chars().count() + 1).sum();
    let compact = full_width > inner_width;

    let mut spans = Vec::new();
    for kind in ChannelKind::ALL {
        let active = day.channel(kind).is_some_and(|c| c.active);
        let accent = channel_accent(kind);
        let style = if active {
            Style::default()
                .fg(get_contrast_text_color(accent))
                .bg(accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(muted)
        };
        spans.push(Span::styled(chip_label(kind, compact), style));
        spans.push(Span::raw(" "));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Canais")
                .border_style(Style::default().fg(muted))
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color));

    f.render_widget(paragraph, area);
}

fn chip_label(kind: ChannelKind, compact: bool) -> String {
    if compact {
        format!(" {} {} ", kind.index() + 1, kind.id().to_uppercase())
    } else {
        format!(" {} {} ", kind.index() + 1, kind.name())
    }
}
