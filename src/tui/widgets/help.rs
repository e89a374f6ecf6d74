use crate::config::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as key;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup_area = popup_area(area, 60, 70);
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
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

pub fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Switch view\n", key(&kb.tab_left), key(&kb.tab_right)));
    text.push_str(&format!(
        "  {} / {} / {} / {}: All, Next, Ideas, Archive\n",
        key(&kb.tab_1),
        key(&kb.tab_2),
        key(&kb.tab_3),
        key(&kb.tab_4)
    ));
    text.push_str(&format!("  {} / {} or ↑ / ↓: Move in list\n", key(&kb.list_up), key(&kb.list_down)));
    text.push_str("  PgUp / PgDn: Scroll details\n");
    text.push('\n');

    text.push_str("Entries:\n");
    text.push_str(&format!("  {}: New entry\n", key(&kb.new)));
    text.push_str(&format!("  {} / {}: Edit selected entry\n", key(&kb.edit), key(&kb.select)));
    text.push_str(&format!("  {}: Mark done\n", key(&kb.done)));
    text.push_str(&format!("  {}: Archive\n", key(&kb.archive)));
    text.push_str(&format!("  {}: Restore (Archive view)\n", key(&kb.restore)));
    text.push_str(&format!("  {}: Archive or delete...\n", key(&kb.delete)));
    text.push('\n');

    text.push_str("Form:\n");
    text.push_str(&format!("  {}: Save\n", key(&kb.save)));
    text.push_str("  Tab / Shift+Tab: Next/previous field\n");
    text.push_str("  ← / →: Change type (Type field)\n");
    text.push_str("  Enter: New line in details\n");
    text.push_str("  Esc: Cancel\n");
    text.push('\n');

    text.push_str("Reminders:\n");
    text.push_str("  ↑ / ↓ and Enter: Snooze, mark done or close\n");
    text.push_str("  Esc: Close (the reminder will not fire again)\n");
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Cycle theme\n", key(&kb.cycle_theme)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&kb.help)));
    text.push_str(&format!("  {}: Quit\n", key(&kb.quit)));

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_follows_configured_bindings() {
        let mut config = Config::default();
        config.key_bindings.new = "a".to_string();
        let text = build_help_text(&config);
        assert!(text.contains("  a: New entry"));
        assert!(text.contains("1 / 2 / 3 / 4: All, Next, Ideas, Archive"));
    }
}
