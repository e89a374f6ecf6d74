use crate::config::Config;
use crate::tui::widgets::color::{contrast_color, parse_color};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    message: Option<&String>,
    key_hints: &[String],
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let max_width = area.width as usize;

    let (content, style) = match message {
        Some(msg) => (
            truncate(msg, max_width),
            Style::default()
                .fg(contrast_color(highlight_bg))
                .bg(highlight_bg)
                .add_modifier(Modifier::BOLD),
        ),
        None => (
            fit_hints(key_hints, max_width),
            Style::default().fg(fg_color).bg(bg_color),
        ),
    };

    f.render_widget(Paragraph::new(content).style(style), area);
}

/// Join as many hints as fit in `max_width`, ending with "..." when some are left out
pub fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let mut text = String::new();
    for (i, hint) in key_hints.iter().enumerate() {
        let separator = if i == 0 { "" } else { SEPARATOR };
        let would_be = text.chars().count() + separator.chars().count() + hint.chars().count();

        if would_be > max_width {
            if i == 0 {
                return truncate(hint, max_width);
            }
            if text.chars().count() + ELLIPSIS.len() > max_width {
                text = text.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
            }
            text.push_str(ELLIPSIS);
            return text;
        }

        text.push_str(separator);
        text.push_str(hint);
    }
    text
}

fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> Vec<String> {
        vec!["q: Quit".to_string(), "n: New".to_string(), "F1: Help".to_string()]
    }

    #[test]
    fn all_hints_fit_on_a_wide_bar() {
        assert_eq!(fit_hints(&hints(), 80), "q: Quit • n: New • F1: Help");
    }

    #[test]
    fn narrow_bar_drops_trailing_hints() {
        assert_eq!(fit_hints(&hints(), 20), "q: Quit • n: New...");
        assert_eq!(fit_hints(&hints(), 5), "q:...");
    }
}
