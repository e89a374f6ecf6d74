use crate::config::Config;
use crate::models::{Entry, EntryId, EntryKind};
use crate::organizer::Organizer;
use crate::reminder::Notice;
use crate::scheduler::Scheduler;
use crate::tui::error::TuiError;
use crate::tui::widgets::editor::Editor;
use crate::utils::format_when;
use crate::validation::{EntryDraft, ValidatedDraft, ValidationError};
use crate::views::{View, ViewItem};
use chrono::TimeDelta;
use ratatui::widgets::ListState;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    View,
    Help,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Kind,
    Title,
    When,
    Details,
}

#[derive(Debug, Clone)]
pub struct EntryForm {
    pub current_field: FormField,
    pub kind: EntryKind,
    pub title: Editor,
    pub when: Editor,
    pub details: Editor,
    /// Set when editing an existing entry
    pub editing: Option<EntryId>,
    pub error: Option<String>,
}

impl EntryForm {
    pub fn blank(kind: EntryKind) -> Self {
        Self {
            current_field: FormField::Title,
            kind,
            title: Editor::single_line(),
            when: Editor::single_line(),
            details: Editor::multi_line(),
            editing: None,
            error: None,
        }
    }

    pub fn for_entry(entry: &Entry) -> Self {
        let when = entry.scheduled_time.map(|t| format_when(&t)).unwrap_or_default();
        Self {
            title: Editor::single_line().with_text(&entry.title),
            when: Editor::single_line().with_text(&when),
            details: Editor::multi_line().with_text(&entry.details),
            editing: Some(entry.id),
            ..Self::blank(entry.kind)
        }
    }

    /// Ideas carry no schedule, so the When field is skipped for them
    pub fn uses_when(&self) -> bool {
        self.kind != EntryKind::Idea
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            FormField::Kind => FormField::Title,
            FormField::Title if self.uses_when() => FormField::When,
            FormField::Title | FormField::When => FormField::Details,
            FormField::Details => FormField::Kind,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            FormField::Kind => FormField::Details,
            FormField::Title => FormField::Kind,
            FormField::When => FormField::Title,
            FormField::Details if self.uses_when() => FormField::When,
            FormField::Details => FormField::Title,
        };
    }

    pub fn cycle_kind(&mut self, forward: bool) {
        self.kind = if forward { self.kind.next() } else { self.kind.previous() };
    }

    /// Editor behind the focused field; the kind selector has none
    pub fn current_editor(&mut self) -> Option<&mut Editor> {
        match self.current_field {
            FormField::Kind => None,
            FormField::Title => Some(&mut self.title),
            FormField::When => Some(&mut self.when),
            FormField::Details => Some(&mut self.details),
        }
    }

    pub fn validate(&self) -> Result<ValidatedDraft, ValidationError> {
        let draft = EntryDraft::new(self.kind, self.title.text()).details(self.details.text());
        let draft = if self.uses_when() {
            draft.scheduled_from_input(&self.when.text())?
        } else {
            draft
        };
        draft.validate()
    }
}

/// Choices offered by the reminder popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    Snooze(TimeDelta),
    Done,
    Close,
}

impl ReminderAction {
    pub fn label(&self) -> String {
        match self {
            ReminderAction::Snooze(delta) => format!("Snooze {} min", delta.num_minutes()),
            ReminderAction::Done => "Done".to_string(),
            ReminderAction::Close => "Close".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub current_view: View,
    pub mode: Mode,
    pub selected_index: usize,
    pub list_state: ListState,
    pub detail_scroll: usize,
}

#[derive(Debug, Clone)]
pub struct ModalState {
    pub delete_confirmation: Option<Entry>,
    pub delete_modal_selection: usize, // 0=Archive/Restore, 1=Delete, 2=Cancel
}

#[derive(Debug)]
pub struct ReminderState {
    notices: Receiver<Notice>,
    pub queue: VecDeque<Entry>,
    /// Reminder shown in the popup
    pub active: Option<Entry>,
    pub selection: usize,
}

#[derive(Debug, Clone)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub entry_form: Option<EntryForm>,
}

pub struct App {
    pub config: Config,
    /// Where theme changes are saved; `None` keeps them in memory
    config_path: Option<PathBuf>,
    pub organizer: Organizer,
    pub items: Vec<ViewItem>,
    scheduler: Option<Scheduler>,

    // Grouped state
    pub ui: UiState,
    pub modals: ModalState,
    pub reminders: ReminderState,
    pub status: StatusState,
    pub form: FormState,
}

impl App {
    /// Build the app and start the background reminder checks
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        organizer: Organizer,
    ) -> Result<Self, TuiError> {
        let (sender, receiver) = mpsc::channel();
        let scheduler = Scheduler::start(organizer.clone(), config.check_interval(), sender)?;

        let mut app = Self::detached(config, organizer, receiver);
        app.config_path = config_path;
        app.scheduler = Some(scheduler);
        Ok(app)
    }

    /// App fed by an external notice channel, without a scheduler of its own
    pub fn detached(config: Config, organizer: Organizer, notices: Receiver<Notice>) -> Self {
        let mut app = Self {
            config,
            config_path: None,
            organizer,
            items: Vec::new(),
            scheduler: None,
            ui: UiState {
                current_view: View::default(),
                mode: Mode::View,
                selected_index: 0,
                list_state: ListState::default(),
                detail_scroll: 0,
            },
            modals: ModalState {
                delete_confirmation: None,
                delete_modal_selection: 0,
            },
            reminders: ReminderState {
                notices,
                queue: VecDeque::new(),
                active: None,
                selection: 0,
            },
            status: StatusState {
                message: None,
                message_time: None,
            },
            form: FormState { entry_form: None },
        };
        app.refresh();
        app
    }

    /// Reload the current view and keep the selection in range
    pub fn refresh(&mut self) {
        self.items = self.organizer.view(self.ui.current_view);
        if self.ui.selected_index >= self.items.len() {
            self.ui.selected_index = self.items.len().saturating_sub(1);
        }
        self.sync_list_state();
    }

    pub fn sync_list_state(&mut self) {
        if self.items.is_empty() {
            self.ui.list_state.select(None);
        } else {
            self.ui.list_state.select(Some(self.ui.selected_index));
        }
    }

    pub fn selected_item(&self) -> Option<&ViewItem> {
        self.items.get(self.ui.selected_index)
    }

    fn select_entry(&mut self, id: EntryId) {
        if let Some(index) = self.items.iter().position(|item| item.entry.id == id) {
            self.ui.selected_index = index;
            self.sync_list_state();
        }
    }

    pub fn move_selection_up(&mut self) {
        if self.ui.selected_index > 0 {
            self.ui.selected_index -= 1;
            self.ui.detail_scroll = 0;
            self.sync_list_state();
        }
    }

    pub fn move_selection_down(&mut self) {
        if self.ui.selected_index + 1 < self.items.len() {
            self.ui.selected_index += 1;
            self.ui.detail_scroll = 0;
            self.sync_list_state();
        }
    }

    /// Switch to a view and select its first entry
    pub fn switch_view(&mut self, view: View) {
        self.ui.current_view = view;
        self.ui.selected_index = 0;
        self.ui.detail_scroll = 0;
        self.refresh();
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Check if status message should be auto-cleared (after 3 seconds)
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    pub fn enter_help_mode(&mut self) {
        self.ui.mode = Mode::Help;
    }

    pub fn exit_help_mode(&mut self) {
        self.ui.mode = Mode::View;
    }

    pub fn enter_create_mode(&mut self) {
        let kind = match self.ui.current_view {
            View::Ideas => EntryKind::Idea,
            View::Next => EntryKind::Appointment,
            View::All | View::Archive => EntryKind::Task,
        };
        self.form.entry_form = Some(EntryForm::blank(kind));
        self.ui.mode = Mode::Form;
    }

    pub fn enter_edit_mode(&mut self) {
        let Some(item) = self.selected_item() else {
            self.set_status_message("No entry selected".to_string());
            return;
        };
        if item.entry.archived {
            self.set_status_message("Restore the entry before editing it".to_string());
            return;
        }
        let form = EntryForm::for_entry(&item.entry);
        self.form.entry_form = Some(form);
        self.ui.mode = Mode::Form;
    }

    pub fn exit_form_mode(&mut self) {
        self.form.entry_form = None;
        self.ui.mode = Mode::View;
    }

    /// Validate and store the open form. Invalid input keeps the form open.
    pub fn save_form(&mut self) {
        let Some(form) = self.form.entry_form.as_mut() else {
            return;
        };

        let draft = match form.validate() {
            Ok(draft) => draft,
            Err(e) => {
                form.error = Some(e.to_string());
                return;
            }
        };

        let (saved, message) = match form.editing {
            Some(id) => match self.organizer.update(id, draft) {
                Ok(entry) => (entry, "Entry updated"),
                Err(e) => {
                    form.error = Some(e.to_string());
                    return;
                }
            },
            None => (self.organizer.create(draft), "Entry created"),
        };

        self.exit_form_mode();
        self.refresh();
        self.select_entry(saved.id);
        self.set_status_message(message.to_string());
    }

    pub fn request_delete(&mut self) {
        if let Some(entry) = self.selected_item().map(|item| item.entry.clone()) {
            self.modals.delete_confirmation = Some(entry);
            self.modals.delete_modal_selection = 0;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.modals.delete_confirmation = None;
    }

    /// Run the option highlighted in the delete confirmation and close it
    pub fn confirm_delete_selection(&mut self) {
        let Some(entry) = self.modals.delete_confirmation.take() else {
            return;
        };
        match self.modals.delete_modal_selection {
            0 if entry.archived => self.restore(entry.id),
            0 => self.archive(entry.id),
            1 => match self.organizer.delete(entry.id) {
                Ok(removed) => {
                    self.refresh();
                    self.set_status_message(format!("Deleted '{}'", removed.title));
                }
                Err(e) => self.set_status_message(e.to_string()),
            },
            _ => {}
        }
    }

    fn archive(&mut self, id: EntryId) {
        match self.organizer.archive(id) {
            Ok(entry) => {
                self.refresh();
                self.set_status_message(format!("Archived '{}'", entry.title));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn restore(&mut self, id: EntryId) {
        match self.organizer.unarchive(id) {
            Ok(entry) => {
                self.refresh();
                self.set_status_message(format!("Restored '{}'", entry.title));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    pub fn archive_selected(&mut self) {
        match self.selected_item().map(|item| (item.entry.id, item.entry.archived)) {
            Some((_, true)) => self.set_status_message("Already archived".to_string()),
            Some((id, false)) => self.archive(id),
            None => {}
        }
    }

    pub fn restore_selected(&mut self) {
        match self.selected_item().map(|item| (item.entry.id, item.entry.archived)) {
            Some((id, true)) => self.restore(id),
            Some((_, false)) => self.set_status_message("Only archived entries can be restored".to_string()),
            None => {}
        }
    }

    pub fn mark_selected_done(&mut self) {
        let Some(id) = self.selected_item().map(|item| item.entry.id) else {
            return;
        };
        match self.organizer.mark_done(id) {
            Ok(entry) => {
                self.refresh();
                self.set_status_message(format!("'{}' done", entry.title));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    /// Drain reminder notices from the scheduler and show the next popup
    pub fn poll_notices(&mut self) {
        let mut received = false;
        loop {
            match self.reminders.notices.try_recv() {
                Ok(Notice::ReminderDue(entry)) => {
                    received = true;
                    let id = entry.id;
                    let pending = self.reminders.active.iter().any(|e| e.id == id)
                        || self.reminders.queue.iter().any(|e| e.id == id);
                    if !pending {
                        self.reminders.queue.push_back(entry);
                    }
                }
                Ok(Notice::Archived(_)) => received = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if received {
            self.refresh();
        }
        if self.reminders.active.is_none() {
            self.show_next_reminder();
        }
    }

    fn show_next_reminder(&mut self) {
        self.reminders.active = self.reminders.queue.pop_front();
        self.reminders.selection = 0;
    }

    pub fn reminder_actions(&self) -> Vec<ReminderAction> {
        let mut actions: Vec<ReminderAction> = self
            .config
            .snooze_options()
            .into_iter()
            .map(ReminderAction::Snooze)
            .collect();
        actions.push(ReminderAction::Done);
        actions.push(ReminderAction::Close);
        actions
    }

    pub fn move_reminder_selection_up(&mut self) {
        let count = self.reminder_actions().len();
        self.reminders.selection = (self.reminders.selection + count - 1) % count;
    }

    pub fn move_reminder_selection_down(&mut self) {
        let count = self.reminder_actions().len();
        self.reminders.selection = (self.reminders.selection + 1) % count;
    }

    pub fn confirm_reminder_selection(&mut self) {
        let actions = self.reminder_actions();
        let action = actions
            .get(self.reminders.selection)
            .copied()
            .unwrap_or(ReminderAction::Close);
        self.apply_reminder_action(action);
    }

    /// Act on the reminder in the popup, then move on to the next one
    pub fn apply_reminder_action(&mut self, action: ReminderAction) {
        let Some(entry) = self.reminders.active.take() else {
            return;
        };

        match action {
            ReminderAction::Snooze(delta) => match self.organizer.snooze(entry.id, delta) {
                Ok(until) => self.set_status_message(format!(
                    "'{}' snoozed until {}",
                    entry.title,
                    until.format("%H:%M")
                )),
                Err(e) => self.set_status_message(e.to_string()),
            },
            ReminderAction::Done => match self.organizer.mark_done(entry.id) {
                Ok(_) => self.set_status_message(format!("'{}' done", entry.title)),
                Err(e) => self.set_status_message(e.to_string()),
            },
            ReminderAction::Close => {}
        }

        self.refresh();
        self.show_next_reminder();
    }

    /// Switch to the next theme and remember it in the config file
    pub fn cycle_theme(&mut self) {
        let theme = self.config.next_theme();
        if let Some(path) = self.config_path.clone() {
            if let Err(e) = self.config.save_to(&path) {
                tracing::warn!(error = %e, "failed to save theme");
                self.set_status_message(format!("Theme '{}' not saved: {}", theme, e));
                return;
            }
        }
        self.set_status_message(format!("Theme: {}", theme));
    }

    pub fn scroll_detail_up(&mut self, lines: usize) {
        self.ui.detail_scroll = self.ui.detail_scroll.saturating_sub(lines);
    }

    /// Render clamps the offset to the content height
    pub fn scroll_detail_down(&mut self, lines: usize) {
        self.ui.detail_scroll = self.ui.detail_scroll.saturating_add(lines);
    }

    /// Stop the background reminder checks
    pub fn shutdown(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::ReminderEngine;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::mpsc::Sender;
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
        let app = App::detached(Config::default(), organizer, receiver);
        (dir, sender, app)
    }

    fn add(app: &App, kind: EntryKind, title: &str, offset: Option<TimeDelta>) -> Entry {
        let draft = EntryDraft::new(kind, title)
            .scheduled(offset.map(|o| now() + o))
            .validate()
            .unwrap();
        app.organizer.create(draft)
    }

    fn type_into(editor: &mut Editor, text: &str) {
        for ch in text.chars() {
            editor.insert_char(ch);
        }
    }

    #[test]
    fn views_filter_the_list() {
        let (_dir, _sender, mut app) = test_app();
        add(&app, EntryKind::Idea, "Learn the cello", None);
        add(&app, EntryKind::Task, "Pay rent", Some(TimeDelta::hours(2)));

        app.switch_view(View::All);
        assert_eq!(app.items.len(), 2);

        app.switch_view(View::Ideas);
        assert_eq!(app.items.len(), 1);
        assert_eq!(app.items[0].entry.title, "Learn the cello");
        assert_eq!(app.ui.list_state.selected(), Some(0));

        app.switch_view(View::Archive);
        assert!(app.items.is_empty());
        assert_eq!(app.ui.list_state.selected(), None);
    }

    #[test]
    fn invalid_form_stays_open_with_error() {
        let (_dir, _sender, mut app) = test_app();
        app.switch_view(View::Next);
        app.enter_create_mode();
        {
            let form = app.form.entry_form.as_mut().unwrap();
            assert_eq!(form.kind, EntryKind::Appointment);
            type_into(&mut form.title, "Dentist");
        }

        app.save_form();
        assert_eq!(app.ui.mode, Mode::Form);
        let form = app.form.entry_form.as_ref().unwrap();
        assert_eq!(
            form.error.as_deref(),
            Some(ValidationError::MissingSchedule.to_string().as_str())
        );
        assert!(app.organizer.entries().is_empty());
    }

    #[test]
    fn saving_the_form_creates_and_selects_the_entry() {
        let (_dir, _sender, mut app) = test_app();
        add(&app, EntryKind::Task, "Existing", None);
        app.enter_create_mode();
        {
            let form = app.form.entry_form.as_mut().unwrap();
            form.cycle_kind(true);
            assert_eq!(form.kind, EntryKind::Appointment);
            type_into(&mut form.title, "Dentist");
            type_into(&mut form.when, "2025-06-14 10:30");
        }

        app.save_form();
        assert_eq!(app.ui.mode, Mode::View);
        let selected = app.selected_item().unwrap();
        assert_eq!(selected.entry.title, "Dentist");
        assert_eq!(selected.entry.reminder_time, selected.entry.scheduled_time);
        assert_eq!(app.status.message.as_deref(), Some("Entry created"));
    }

    #[test]
    fn ideas_skip_the_when_field() {
        let mut form = EntryForm::blank(EntryKind::Idea);
        type_into(&mut form.when, "not a date");
        form.next_field();
        assert_eq!(form.current_field, FormField::Details);
        form.previous_field();
        assert_eq!(form.current_field, FormField::Title);

        type_into(&mut form.title, "Someday");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn editing_rearms_the_reminder() {
        let (_dir, _sender, mut app) = test_app();
        let entry = add(&app, EntryKind::Task, "Call mom", Some(TimeDelta::minutes(-5)));
        app.organizer.evaluate(&mut crate::reminder::NullSink);
        assert!(app.organizer.get(entry.id).unwrap().notified);

        app.refresh();
        app.enter_edit_mode();
        {
            let form = app.form.entry_form.as_mut().unwrap();
            assert_eq!(form.editing, Some(entry.id));
            form.current_field = FormField::When;
            let editor = form.current_editor().unwrap();
            *editor = Editor::single_line().with_text("2025-06-14 18:00");
        }
        app.save_form();

        let updated = app.organizer.get(entry.id).unwrap();
        assert!(!updated.notified);
        assert_eq!(updated.reminder_time, Some(now() + TimeDelta::hours(9)));
    }

    #[test]
    fn reminders_pop_up_one_at_a_time() {
        let (_dir, sender, mut app) = test_app();
        let first = add(&app, EntryKind::Task, "Stretch", Some(TimeDelta::zero()));
        let second = add(&app, EntryKind::Task, "Water plants", Some(TimeDelta::zero()));

        sender.send(Notice::ReminderDue(first.clone())).unwrap();
        sender.send(Notice::ReminderDue(second.clone())).unwrap();
        sender.send(Notice::ReminderDue(first.clone())).unwrap();
        app.poll_notices();

        assert_eq!(app.reminders.active.as_ref().map(|e| e.id), Some(first.id));
        assert_eq!(app.reminders.queue.len(), 1);

        app.apply_reminder_action(ReminderAction::Close);
        assert_eq!(app.reminders.active.as_ref().map(|e| e.id), Some(second.id));

        app.apply_reminder_action(ReminderAction::Done);
        assert!(app.reminders.active.is_none());
        let done = app.organizer.get(second.id).unwrap();
        assert!(done.done && done.archived);
    }

    #[test]
    fn snoozing_from_the_popup_moves_the_reminder() {
        let (_dir, sender, mut app) = test_app();
        let entry = add(&app, EntryKind::Appointment, "Standup", Some(TimeDelta::zero()));
        sender.send(Notice::ReminderDue(entry.clone())).unwrap();
        app.poll_notices();

        assert_eq!(
            app.reminder_actions(),
            vec![
                ReminderAction::Snooze(TimeDelta::minutes(5)),
                ReminderAction::Snooze(TimeDelta::minutes(10)),
                ReminderAction::Done,
                ReminderAction::Close,
            ]
        );
        app.move_reminder_selection_down();
        app.confirm_reminder_selection();

        let snoozed = app.organizer.get(entry.id).unwrap();
        assert_eq!(snoozed.reminder_time, Some(now() + TimeDelta::minutes(10)));
        assert!(!snoozed.notified);
        assert!(app.reminders.active.is_none());
    }

    #[test]
    fn delete_confirmation_archives_then_deletes() {
        let (_dir, _sender, mut app) = test_app();
        add(&app, EntryKind::Idea, "Old idea", None);
        app.refresh();

        app.request_delete();
        app.confirm_delete_selection();
        assert!(app.items.is_empty());

        app.switch_view(View::Archive);
        assert_eq!(app.items.len(), 1);
        app.request_delete();
        app.modals.delete_modal_selection = 1;
        app.confirm_delete_selection();
        assert!(app.items.is_empty());
        assert!(app.organizer.entries().is_empty());
    }

    #[test]
    fn overdue_entries_cannot_be_restored() {
        let (_dir, _sender, mut app) = test_app();
        let entry = add(&app, EntryKind::Task, "Taxes", Some(TimeDelta::hours(-30)));
        app.switch_view(View::Archive);
        assert_eq!(app.items.len(), 1);
        assert!(!app.items[0].restorable);

        app.restore_selected();
        assert!(app.organizer.get(entry.id).unwrap().archived);
        assert!(app.status.message.as_deref().unwrap().contains("too far overdue"));
    }
}
