use crate::config::Config;
use crate::models::EntryKind;
use crate::tui::widgets::color::{contrast_color, parse_color};
use crate::utils::format_when;
use crate::views::{View, ViewItem};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Scrollbar, ScrollbarOrientation, ScrollbarState,
    StatefulWidget,
};

/// One list row: state marker, kind, title and schedule, cut to `max_width`
pub fn list_line(item: &ViewItem, max_width: usize) -> String {
    let entry = &item.entry;
    let marker = if entry.done {
        "✓"
    } else if entry.archived && !item.restorable {
        "×"
    } else if entry.notified {
        "!"
    } else {
        "○"
    };
    let kind = match entry.kind {
        EntryKind::Idea => "I",
        EntryKind::Task => "T",
        EntryKind::Appointment => "A",
    };
    let when = entry
        .scheduled_time
        .map(|t| format!(" [{}]", format_when(&t)))
        .unwrap_or_default();

    let line = format!("{} {} {}{}", marker, kind, entry.title, when);
    if line.chars().count() > max_width {
        line.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        line
    }
}

pub fn render_entry_list(
    f: &mut Frame,
    area: Rect,
    items: &[ViewItem],
    view: View,
    list_state: &mut ListState,
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = if active_theme.highlight_fg.is_empty() {
        contrast_color(highlight_bg)
    } else {
        parse_color(&active_theme.highlight_fg)
    };

    let list_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // Scrollbar
        ])
        .split(area);
    let list_area = list_areas[0];
    let scrollbar_area = list_areas[1];

    // 2 for borders, 2 for padding
    let max_width = list_area.width.saturating_sub(4) as usize;
    let rows: Vec<ListItem> = if items.is_empty() {
        vec![ListItem::new(view.empty_message())]
    } else {
        items.iter().map(|item| ListItem::new(list_line(item, max_width))).collect()
    };

    let title = format!("{} ({})", view.title(), items.len());
    let list = List::new(rows)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(fg_color))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    StatefulWidget::render(list, list_area, f.buffer_mut(), list_state);

    let visible_items = list_area.height.saturating_sub(2) as usize;
    if items.len() > visible_items && scrollbar_area.width > 0 && visible_items > 0 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1,
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );

        let selected_index = list_state.selected().unwrap_or(0);
        let scroll_position = selected_index.saturating_sub(visible_items - 1);
        let mut scrollbar_state = ScrollbarState::new(items.len())
            .viewport_content_length(visible_items)
            .position(scroll_position);

        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");

        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entry;
    use chrono::NaiveDate;

    fn item(kind: EntryKind, title: &str) -> ViewItem {
        ViewItem {
            entry: Entry::new(kind, title.to_string()),
            restorable: true,
        }
    }

    #[test]
    fn rows_show_state_kind_and_schedule() {
        let mut appointment = item(EntryKind::Appointment, "Dentist");
        appointment
            .entry
            .reschedule(NaiveDate::from_ymd_opt(2025, 6, 14).and_then(|d| d.and_hms_opt(10, 30, 0)));
        assert_eq!(list_line(&appointment, 80), "○ A Dentist [2025-06-14 10:30]");

        appointment.entry.notified = true;
        assert!(list_line(&appointment, 80).starts_with("! A"));

        let mut done = item(EntryKind::Task, "Laundry");
        done.entry.done = true;
        assert_eq!(list_line(&done, 80), "✓ T Laundry");
    }

    #[test]
    fn long_titles_are_cut() {
        let idea = item(EntryKind::Idea, "A very long idea about many things");
        assert_eq!(list_line(&idea, 12), "○ I A ver...");
    }
}
