use crate::config::Config;
use crate::tui::widgets::color::parse_color;
use crate::utils::format_when;
use crate::views::ViewItem;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use ratskin::RatSkin;
use std::cmp;
use termimad::minimad::Text as MinimadText;

fn status_label(item: &ViewItem) -> &'static str {
    let entry = &item.entry;
    if entry.done {
        "Done"
    } else if entry.archived && item.restorable {
        "Archived"
    } else if entry.archived {
        "Archived (too far overdue to restore)"
    } else {
        "Active"
    }
}

/// Markdown shown in the detail pane for an entry
pub fn get_content_string(item: &ViewItem) -> String {
    let entry = &item.entry;
    let mut content = format!("**Title:** {}\n", entry.title);
    content.push_str(&format!("**Type:** {}\n", entry.kind.label()));
    content.push_str(&format!("**Status:** {}\n", status_label(item)));

    if let Some(ref scheduled) = entry.scheduled_time {
        content.push_str(&format!("**When:** {}\n", format_when(scheduled)));
    }

    if let Some(ref reminder) = entry.reminder_time {
        let reminder_line = if entry.notified {
            "sent".to_string()
        } else if entry.scheduled_time.as_ref() != Some(reminder) {
            format!("snoozed until {}", format_when(reminder))
        } else {
            format!("at {}", format_when(reminder))
        };
        content.push_str(&format!("**Reminder:** {}\n", reminder_line));
    }

    if !entry.details.is_empty() {
        content.push_str("\n**Details:**\n\n");
        content.push_str(&entry.details);
        content.push('\n');
    }

    content.push_str(&format!("\n*id {}*\n", entry.id.short()));
    content
}

/// Draw the selected entry. Returns the scroll offset actually used, which is
/// `scroll_offset` clamped to the content height.
pub fn render_entry_view(
    f: &mut Frame,
    area: Rect,
    item: &ViewItem,
    config: &Config,
    scroll_offset: usize,
) -> usize {
    if area.width < 2 || area.height < 2 {
        return scroll_offset;
    }

    let horizontal = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // Scrollbar
        ])
        .split(area);
    let content_area = horizontal[0];
    let scrollbar_area = horizontal[1];

    let viewport_height = (area.height - 2) as usize;
    let text_width: u16 = content_area.width.saturating_sub(2);

    let content_string = get_content_string(item);
    let content_lines = RatSkin::default().parse(MinimadText::from(content_string.as_str()), text_width);

    // ratskin lines carry their own styling
    let lines: Vec<Line> = content_lines
        .into_iter()
        .map(|line| {
            let spans: Vec<Span> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.to_string(), span.style))
                .collect();
            Line::from(spans)
        })
        .collect();

    let total_lines = lines.len();
    let max_scroll = total_lines.saturating_sub(viewport_height);
    let scroll_offset = cmp::min(scroll_offset, max_scroll);
    let end_line = cmp::min(scroll_offset + viewport_height, total_lines);
    let visible_text = if scroll_offset < total_lines {
        Text::from(lines[scroll_offset..end_line].to_vec())
    } else {
        Text::default()
    };

    let base_style = Style::default().fg(parse_color(&config.get_active_theme().fg));
    let paragraph = Paragraph::new(visible_text)
        .block(Block::default().borders(Borders::ALL).title(item.entry.kind.label()))
        .style(base_style)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, content_area);

    if total_lines > viewport_height {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            content_area.y + 1,
            scrollbar_area.width,
            content_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .viewport_content_length(viewport_height)
            .position(scroll_offset);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }

    scroll_offset
}
