use crate::config::Config;
use crate::models::Entry;
use crate::tui::app::ReminderAction;
use crate::tui::widgets::color::{contrast_color, parse_color};
use crate::tui::widgets::popup_area;
use crate::utils::format_when;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

pub fn render_reminder_popup(
    f: &mut Frame,
    area: Rect,
    entry: &Entry,
    actions: &[ReminderAction],
    selection: usize,
    pending: usize,
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let alert_color = parse_color(&active_theme.alert);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let normal = Style::default().fg(fg_color).bg(bg_color);

    let popup_area = popup_area(area, 50, 50);
    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(
            entry.title.clone(),
            normal.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(entry.kind.label(), normal)),
    ];
    if let Some(ref scheduled) = entry.scheduled_time {
        lines.push(Line::from(Span::styled(format_when(scheduled), normal)));
    }
    if let Some(first) = entry.details.lines().next() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(first.to_string(), normal)));
    }
    lines.push(Line::from(""));

    for (index, action) in actions.iter().enumerate() {
        let (prefix, style) = if index == selection {
            ("> ", Style::default().fg(contrast_color(highlight_bg)).bg(highlight_bg))
        } else {
            ("  ", normal)
        };
        lines.push(Line::from(Span::styled(format!("{}{}", prefix, action.label()), style)));
    }

    if pending > 0 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("{} more waiting", pending), normal)));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Reminder")
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(alert_color))
                .style(normal),
        )
        .style(normal)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
