use crate::tui::app::{App, FormField, Mode, ReminderAction};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{ParsedKeyBinding, has_primary_modifier, parse_key_binding};
use crate::views::View;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    size as terminal_size,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io;
use std::time::Duration;

/// Lines moved by PageUp/PageDown in the detail pane
const DETAIL_PAGE: usize = 10;

/// Restores the terminal when dropped, so a panic does not leave it in raw
/// mode on the alternate screen
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;

        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore on normal exit; the guard does nothing on drop afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Already cleaning up, errors have nowhere to go
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Checked before entering the alternate screen so the message stays visible
    let (width, height) = terminal_size()?;
    let min_width_with_border = Layout::MIN_WIDTH + 2;
    let min_height_with_border = Layout::MIN_HEIGHT + 2;

    if width < min_width_with_border || height < min_height_with_border {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width_with_border, min_height_with_border
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    tracing::info!("terminal UI started");

    loop {
        app.check_status_message_timeout();
        app.poll_notices();

        let terminal_size = terminal.size()?;
        let terminal_rect = Rect::new(0, 0, terminal_size.width, terminal_size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(terminal_rect, app.config.sidebar_width_percent);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        if event::poll(Duration::from_millis(16))? {
            // Press only: Windows also reports releases
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                    break;
                }
            }
        }
    }

    app.shutdown();
    guard.restore()?;
    tracing::info!("terminal UI stopped");

    Ok(())
}

/// Route a key press to whatever currently has focus. Returns `true` to quit.
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if app.reminders.active.is_some() {
        handle_reminder_popup(app, key_event);
        return Ok(false);
    }
    if app.modals.delete_confirmation.is_some() {
        handle_delete_confirmation_modal(app, key_event);
        return Ok(false);
    }

    match app.ui.mode {
        Mode::Help => handle_help_mode(app, key_event),
        Mode::Form => handle_form_mode(app, key_event),
        Mode::View => handle_global_key_bindings(app, key_event),
    }
}

fn handle_reminder_popup(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Up | KeyCode::Char('k') => app.move_reminder_selection_up(),
        KeyCode::Down | KeyCode::Char('j') => app.move_reminder_selection_down(),
        KeyCode::Enter => app.confirm_reminder_selection(),
        KeyCode::Esc => app.apply_reminder_action(ReminderAction::Close),
        _ => {}
    }
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) {
    match key_event.code {
        KeyCode::Up => {
            app.modals.delete_modal_selection = (app.modals.delete_modal_selection + 2) % 3;
        }
        KeyCode::Down => {
            app.modals.delete_modal_selection = (app.modals.delete_modal_selection + 1) % 3;
        }
        KeyCode::Enter => app.confirm_delete_selection(),
        KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc || matches_binding(&app.config.key_bindings.help, key_event)? {
        app.exit_help_mode();
    }
    Ok(false)
}

fn handle_form_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if matches_binding(&app.config.key_bindings.save, key_event)? {
        app.save_form();
        return Ok(false);
    }

    match key_event.code {
        KeyCode::Esc => {
            app.exit_form_mode();
            return Ok(false);
        }
        KeyCode::Tab => {
            if let Some(form) = app.form.entry_form.as_mut() {
                form.next_field();
            }
            return Ok(false);
        }
        KeyCode::BackTab => {
            if let Some(form) = app.form.entry_form.as_mut() {
                form.previous_field();
            }
            return Ok(false);
        }
        _ => {}
    }

    let Some(form) = app.form.entry_form.as_mut() else {
        return Ok(false);
    };

    if form.current_field == FormField::Kind {
        match key_event.code {
            KeyCode::Left => form.cycle_kind(false),
            KeyCode::Right | KeyCode::Char(' ') => form.cycle_kind(true),
            KeyCode::Enter | KeyCode::Down => form.next_field(),
            KeyCode::Up => form.previous_field(),
            _ => {}
        }
        return Ok(false);
    }

    let primary = has_primary_modifier(key_event.modifiers);
    let Some(editor) = form.current_editor() else {
        return Ok(false);
    };
    let multi_line = editor.is_multi_line();

    match key_event.code {
        KeyCode::Char(c) if !primary => editor.insert_char(c),
        KeyCode::Enter if multi_line => editor.insert_newline(),
        KeyCode::Backspace => editor.delete_char(),
        KeyCode::Delete => editor.delete_forward(),
        KeyCode::Left => editor.move_cursor_left(),
        KeyCode::Right => editor.move_cursor_right(),
        KeyCode::Home => editor.move_cursor_home(),
        KeyCode::End => editor.move_cursor_end(),
        KeyCode::Up if multi_line => editor.move_cursor_up(),
        KeyCode::Down if multi_line => editor.move_cursor_down(),
        KeyCode::Up => form.previous_field(),
        KeyCode::Enter | KeyCode::Down => form.next_field(),
        _ => {}
    }

    Ok(false)
}

fn handle_global_key_bindings(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let kb = app.config.key_bindings.clone();

    if matches_binding(&kb.quit, key_event)? {
        return Ok(true);
    }
    if matches_binding(&kb.help, key_event)? {
        app.enter_help_mode();
        return Ok(false);
    }

    for (index, binding) in [&kb.tab_1, &kb.tab_2, &kb.tab_3, &kb.tab_4].into_iter().enumerate() {
        if matches_binding(binding, key_event)? {
            if let Some(view) = View::from_index(index) {
                app.switch_view(view);
            }
            return Ok(false);
        }
    }
    if matches_binding(&kb.tab_left, key_event)? {
        app.switch_view(app.ui.current_view.previous());
        return Ok(false);
    }
    if matches_binding(&kb.tab_right, key_event)? {
        app.switch_view(app.ui.current_view.next());
        return Ok(false);
    }

    if key_event.code == KeyCode::Up || matches_binding(&kb.list_up, key_event)? {
        app.move_selection_up();
    } else if key_event.code == KeyCode::Down || matches_binding(&kb.list_down, key_event)? {
        app.move_selection_down();
    } else if key_event.code == KeyCode::PageUp {
        app.scroll_detail_up(DETAIL_PAGE);
    } else if key_event.code == KeyCode::PageDown {
        app.scroll_detail_down(DETAIL_PAGE);
    } else if matches_binding(&kb.new, key_event)? {
        app.enter_create_mode();
    } else if matches_binding(&kb.edit, key_event)? || matches_binding(&kb.select, key_event)? {
        app.enter_edit_mode();
    } else if matches_binding(&kb.done, key_event)? {
        app.mark_selected_done();
    } else if matches_binding(&kb.archive, key_event)? {
        app.archive_selected();
    } else if matches_binding(&kb.restore, key_event)? {
        app.restore_selected();
    } else if matches_binding(&kb.delete, key_event)? {
        app.request_delete();
    } else if matches_binding(&kb.cycle_theme, key_event)? {
        app.cycle_theme();
    }

    Ok(false)
}

fn matches_binding(binding: &str, key_event: KeyEvent) -> Result<bool, TuiError> {
    let parsed = parse_key_binding(binding).map_err(TuiError::KeyBindingError)?;
    Ok(matches_key_event(key_event, &parsed))
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Ctrl on Windows/Linux, Option/Alt on macOS
    if binding.requires_ctrl != has_primary_modifier(key_event.modifiers) {
        return false;
    }
    binding.key_code == key_event.code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::EntryKind;
    use crate::organizer::Organizer;
    use crate::reminder::{Notice, ReminderEngine};
    use crate::validation::EntryDraft;
    use chrono::{NaiveDate, NaiveDateTime};
    use crossterm::event::KeyModifiers;
    use std::sync::mpsc::{self, Sender};
    use tempfile::TempDir;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 14)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    fn test_app() -> (TempDir, Sender<Notice>, App) {
        let dir = TempDir::new().unwrap();
        let organizer = Organizer::open(dir.path().join("entries.json"), ReminderEngine::default())
            .unwrap()
            .with_clock(now);
        let (sender, receiver) = mpsc::channel();
        (dir, sender, App::detached(Config::default(), organizer, receiver))
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn quit_only_from_the_list() {
        let (_dir, _sender, mut app) = test_app();
        press(&mut app, KeyCode::Char('n'));
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn create_an_idea_from_the_keyboard() {
        let (_dir, _sender, mut app) = test_app();
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.ui.current_view, View::Ideas);

        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Write a haiku");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "about rain");
        let saved = handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL),
        )
        .unwrap();

        assert!(!saved);
        assert_eq!(app.ui.mode, Mode::View);
        let entries = app.organizer.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Idea);
        assert_eq!(entries[0].details, "about rain");
        assert_eq!(app.items.len(), 1);
    }

    #[test]
    fn arrows_switch_views_and_wrap() {
        let (_dir, _sender, mut app) = test_app();
        press(&mut app, KeyCode::Left);
        assert_eq!(app.ui.current_view, View::Archive);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.ui.current_view, View::All);
    }

    #[test]
    fn reminder_popup_takes_the_keyboard() {
        let (_dir, sender, mut app) = test_app();
        let entry = app.organizer.create(
            EntryDraft::new(EntryKind::Task, "Stretch")
                .scheduled(Some(now()))
                .validate()
                .unwrap(),
        );
        sender.send(Notice::ReminderDue(entry.clone())).unwrap();
        app.poll_notices();

        // 'n' would open the form if the popup did not have focus
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.ui.mode, Mode::View);

        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);
        assert!(app.reminders.active.is_none());
        // Wrapped to the last action, Close
        assert_eq!(app.organizer.get(entry.id).unwrap().reminder_time, Some(now()));
    }

    #[test]
    fn delete_modal_cancels_with_escape() {
        let (_dir, _sender, mut app) = test_app();
        app.organizer.create(EntryDraft::new(EntryKind::Idea, "Keep me").validate().unwrap());
        app.refresh();

        press(&mut app, KeyCode::Char('d'));
        assert!(app.modals.delete_confirmation.is_some());
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Esc);
        assert!(app.modals.delete_confirmation.is_none());
        assert_eq!(app.organizer.entries().len(), 1);
    }

    #[test]
    fn bad_binding_is_reported() {
        let (_dir, _sender, mut app) = test_app();
        app.config.key_bindings.quit = "Hyper+q".to_string();
        let result = handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(matches!(result, Err(TuiError::KeyBindingError(_))));
    }
}
