use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area_fixed;

/// Blocking notification; stays until Enter/Esc
pub fn render_alert(f: &mut Frame, area: Rect, message: &str, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let muted = parse_color(&active_theme.muted);
    let error_color = parse_color("lightred");

    let popup_area = popup_area_fixed(area, 50, 9);
    f.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(fg_color))),
        Line::from(""),
        Line::from(Span::styled("Press Enter to continue", Style::default().fg(muted))),
    ];

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    " Sync failed ",
                    Style::default().fg(error_color).add_modifier(Modifier::BOLD),
                ))
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(error_color))
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
