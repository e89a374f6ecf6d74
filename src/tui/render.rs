use crate::tui::app::{App, Mode};
use crate::tui::layout::Layout;
use crate::tui::widgets::{
    color::parse_color,
    confirm_delete::render_confirm_delete,
    entry_list::render_entry_list,
    entry_view::render_entry_view,
    form::render_form,
    help::render_help,
    reminder_popup::render_reminder_popup,
    status_bar::render_status_bar,
    tabs::render_tabs,
};
use crate::utils::format_key_binding_for_display as key;
use crate::views::View;
use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("CalmMind")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.ui.current_view, &app.config);

    render_entry_list(
        f,
        layout.sidebar_area,
        &app.items,
        app.ui.current_view,
        &mut app.ui.list_state,
        &app.config,
    );

    // Main pane; Help is drawn over the normal content below
    match app.ui.mode {
        Mode::Form => {
            if let Some(ref mut form) = app.form.entry_form {
                render_form(f, layout.main_area, form, &app.config);
            }
        }
        Mode::View | Mode::Help => match app.items.get(app.ui.selected_index) {
            Some(item) => {
                app.ui.detail_scroll =
                    render_entry_view(f, layout.main_area, item, &app.config, app.ui.detail_scroll);
            }
            None => {
                let paragraph = Paragraph::new("Select an entry to view details")
                    .block(Block::default().borders(Borders::ALL).title("Details"))
                    .style(Style::default().fg(fg_color));
                f.render_widget(paragraph, layout.main_area);
            }
        },
    }

    if app.ui.mode == Mode::Help {
        render_help(f, f.area(), &app.config);
    }

    if let Some(ref entry) = app.modals.delete_confirmation {
        render_confirm_delete(f, f.area(), entry, app.modals.delete_modal_selection, &app.config);
    }

    // Reminders go on top of everything else
    if let Some(ref entry) = app.reminders.active {
        render_reminder_popup(
            f,
            f.area(),
            entry,
            &app.reminder_actions(),
            app.reminders.selection,
            app.reminders.queue.len(),
            &app.config,
        );
    }

    let key_hints = get_key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_ref(), &key_hints, &app.config);
}

pub fn get_key_hints(app: &App) -> Vec<String> {
    let kb = &app.config.key_bindings;

    if app.reminders.active.is_some() {
        return vec![
            "↑/↓: Choose".to_string(),
            "Enter: Confirm".to_string(),
            "Esc: Close".to_string(),
        ];
    }
    if app.modals.delete_confirmation.is_some() {
        return vec!["↑/↓: Choose".to_string(), "Enter: Confirm".to_string(), "Esc: Cancel".to_string()];
    }

    match app.ui.mode {
        Mode::Help => vec![format!("Esc or {}: Exit help", key(&kb.help))],
        Mode::Form => vec![
            "Tab: Next field".to_string(),
            "Shift+Tab: Previous field".to_string(),
            format!("{}: Save", key(&kb.save)),
            "Esc: Cancel".to_string(),
        ],
        Mode::View => {
            let mut hints = vec![
                format!("{}: Quit", key(&kb.quit)),
                format!("{}: New", key(&kb.new)),
                format!("{}: Edit", key(&kb.edit)),
                format!("{}: Done", key(&kb.done)),
            ];
            if app.ui.current_view == View::Archive {
                hints.push(format!("{}: Restore", key(&kb.restore)));
            } else {
                hints.push(format!("{}: Archive", key(&kb.archive)));
            }
            hints.push(format!("{}: Delete", key(&kb.delete)));
            hints.push(format!("{}: Theme", key(&kb.cycle_theme)));
            hints.push(format!("{}: Help", key(&kb.help)));
            hints
        }
    }
}
