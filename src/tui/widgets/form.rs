use crate::config::Config;
use crate::tui::app::{EntryForm, FormField};
use crate::tui::widgets::color::{contrast_color, parse_color};
use crate::tui::widgets::editor::Editor;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Draw the create/edit form into `area`, placing the terminal cursor in the
/// focused text field
pub fn render_form(f: &mut Frame, area: Rect, form: &mut EntryForm, config: &Config) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let active_theme = config.get_active_theme();
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = if active_theme.highlight_fg.is_empty() {
        contrast_color(highlight_bg)
    } else {
        parse_color(&active_theme.highlight_fg)
    };
    let highlight_style = Style::default().bg(highlight_bg).fg(highlight_fg);
    let inactive_field_style = Style::default()
        .fg(parse_color(&active_theme.fg))
        .add_modifier(Modifier::DIM);
    let alert_style = Style::default().fg(parse_color(&active_theme.alert));

    let field_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Kind
            Constraint::Length(3), // Title
            Constraint::Length(3), // When
            Constraint::Min(3),    // Details
            Constraint::Length(1), // Validation error
        ])
        .split(area);

    let current_field = form.current_field;
    let style_for = |field: FormField| {
        if current_field == field {
            highlight_style
        } else {
            inactive_field_style
        }
    };

    let title = if form.editing.is_some() { "Edit Entry" } else { "New Entry" };
    let kind_paragraph = Paragraph::new(format!("< {} >", form.kind.label()))
        .style(style_for(FormField::Kind))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} - Type (←/→)", title)),
        );
    f.render_widget(kind_paragraph, field_areas[0]);

    render_editor(f, field_areas[1], &mut form.title, "Title", style_for(FormField::Title));

    if form.uses_when() {
        render_editor(
            f,
            field_areas[2],
            &mut form.when,
            "When (YYYY-MM-DD HH:MM)",
            style_for(FormField::When),
        );
    } else {
        let unused = Paragraph::new("Ideas have no date")
            .style(inactive_field_style)
            .block(Block::default().borders(Borders::ALL).title("When"));
        f.render_widget(unused, field_areas[2]);
    }

    render_editor(
        f,
        field_areas[3],
        &mut form.details,
        "Details",
        style_for(FormField::Details),
    );

    if let Some(ref error) = form.error {
        f.render_widget(Paragraph::new(error.as_str()).style(alert_style), field_areas[4]);
    }

    let focused = match form.current_field {
        FormField::Kind => None,
        FormField::Title => Some((&form.title, field_areas[1])),
        FormField::When => Some((&form.when, field_areas[2])),
        FormField::Details => Some((&form.details, field_areas[3])),
    };
    if let Some((x, y)) = focused.and_then(|(editor, rect)| editor.get_cursor_screen_pos(rect)) {
        f.set_cursor_position((x, y));
    }
}

fn render_editor(f: &mut Frame, area: Rect, editor: &mut Editor, title: &str, style: Style) {
    let viewport_height = area.height.saturating_sub(2) as usize;
    let viewport_width = area.width as usize;
    editor.update_scroll(viewport_height, viewport_width);

    let lines: Vec<Line> = editor
        .get_visible_lines(viewport_height, viewport_width)
        .into_iter()
        .map(Line::from)
        .collect();

    let paragraph = Paragraph::new(lines)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(paragraph, area);
}
