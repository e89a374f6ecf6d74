use crate::config::Config;
use crate::models::Entry;
use crate::tui::widgets::color::{contrast_color, parse_color};
use crate::tui::widgets::popup_area;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Options in the order the modal selection indexes them
pub fn options_for(entry: &Entry) -> [&'static str; 3] {
    if entry.archived {
        ["Restore", "Delete", "Cancel"]
    } else {
        ["Archive", "Delete", "Cancel"]
    }
}

pub fn render_confirm_delete(f: &mut Frame, area: Rect, entry: &Entry, selection: usize, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = contrast_color(highlight_bg);
    let normal = Style::default().fg(fg_color).bg(bg_color);

    let popup_area = popup_area(area, 50, 35);
    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("What would you like to do with this {}?", entry.kind.as_str()),
            normal,
        )),
        Line::from(""),
        Line::from(Span::styled(entry.title.clone(), normal)),
        Line::from(""),
    ];

    for (index, option) in options_for(entry).iter().enumerate() {
        let (prefix, style) = if index == selection {
            ("> ", Style::default().fg(highlight_fg).bg(highlight_bg))
        } else {
            ("  ", normal)
        };
        lines.push(Line::from(Span::styled(format!("{}{}", prefix, option), style)));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Use ↑↓ to navigate, Enter to confirm, Esc to cancel",
        normal,
    )));

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Action")
                .title_alignment(Alignment::Center)
                .style(normal),
        )
        .style(normal)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
