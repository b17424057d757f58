use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup_area = popup_area(area, 60, 80);
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, popup_area);
}

fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Calendar:\n");
    text.push_str(&format!("  {} / {}: Previous/next day\n", key(&kb.prev_day), key(&kb.next_day)));
    text.push_str(&format!("  {} / {}: Previous/next month\n", key(&kb.prev_month), key(&kb.next_month)));
    text.push_str(&format!("  {}: Jump to today\n", key(&kb.today)));
    text.push('\n');

    text.push_str("Channels:\n");
    text.push_str("  1-6: Show/hide Facebook, Instagram, WhatsApp, OLX, TikTok, Google Empresa\n");
    text.push('\n');

    text.push_str("Tasks:\n");
    text.push_str(&format!("  {} / {}: Move between tasks\n", key(&kb.list_up), key(&kb.list_down)));
    text.push_str(&format!("  {}: Mark done/undone\n", key(&kb.toggle_completed)));
    text.push_str(&format!("  {}: Switch field (Texto, Imagens, Tags)\n", key(&kb.next_field)));
    text.push_str(&format!("  {}: Edit field\n", key(&kb.edit)));
    text.push_str(&format!("  {}: Copy field to clipboard\n", key(&kb.copy)));
    text.push('\n');

    text.push_str("Editor:\n");
    text.push_str(&format!("  {}: Save and close\n", key(&kb.save)));
    text.push_str(&format!("  {}: Undo\n", key(&kb.undo)));
    text.push_str(&format!("  {} / {}: Word navigation\n", key(&kb.word_left), key(&kb.word_right)));
    text.push_str("  Enter: New line (Texto), save (Imagens, Tags)\n");
    text.push_str("  Esc: Discard changes\n");
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Sync between devices\n", key(&kb.sync)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&kb.help)));
    text.push_str(&format!("  {}: Quit\n", key(&kb.quit)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_reflects_custom_bindings() {
        let mut config = Config::default();
        config.key_bindings.sync = "Ctrl+y".to_string();
        let text = build_help_text(&config);
        assert!(text.contains("Sync between devices"));
        assert!(text.contains(&key("Ctrl+y")));
    }
}
