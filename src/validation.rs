use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{Entry, EntryKind};
use crate::utils::parse_when;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title cannot be empty.")]
    EmptyTitle,
    #[error("Appointments need a date and time.")]
    MissingSchedule,
    #[error("Ideas cannot have a date or time.")]
    IdeaWithSchedule,
    #[error("Invalid date/time '{0}' (expected YYYY-MM-DD HH:MM)")]
    InvalidTime(String),
}

/// User input for a new or edited entry, before validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryDraft {
    pub kind: EntryKind,
    pub title: String,
    pub details: String,
    pub scheduled_time: Option<NaiveDateTime>,
}

/// A draft that passed validation. Only these reach the organizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft(EntryDraft);

impl EntryDraft {
    pub fn new(kind: EntryKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            details: String::new(),
            scheduled_time: None,
        }
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn scheduled(mut self, time: Option<NaiveDateTime>) -> Self {
        self.scheduled_time = time;
        self
    }

    /// Parse a typed schedule; blank input means "no schedule"
    pub fn scheduled_from_input(mut self, input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        self.scheduled_time = if input.is_empty() {
            None
        } else {
            Some(parse_when(input).map_err(|_| ValidationError::InvalidTime(input.to_string()))?)
        };
        Ok(self)
    }

    /// Draft pre-filled from an existing entry, for editing
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            kind: entry.kind,
            title: entry.title.clone(),
            details: entry.details.clone(),
            scheduled_time: entry.scheduled_time,
        }
    }

    pub fn validate(self) -> Result<ValidatedDraft, ValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        match (self.kind, self.scheduled_time) {
            (EntryKind::Appointment, None) => return Err(ValidationError::MissingSchedule),
            (EntryKind::Idea, Some(_)) => return Err(ValidationError::IdeaWithSchedule),
            _ => {}
        }

        Ok(ValidatedDraft(EntryDraft {
            kind: self.kind,
            title,
            details: self.details.trim().to_string(),
            scheduled_time: self.scheduled_time,
        }))
    }
}

impl ValidatedDraft {
    pub fn draft(&self) -> &EntryDraft {
        &self.0
    }

    /// Build a fresh entry; its reminder points at the schedule
    pub fn into_entry(self) -> Entry {
        let draft = self.0;
        let mut entry = Entry::new(draft.kind, draft.title);
        entry.details = draft.details;
        entry.reschedule(draft.scheduled_time);
        entry
    }

    /// Overwrite an entry's user-editable fields; the reminder is re-armed
    pub fn apply_to(self, entry: &mut Entry) {
        let draft = self.0;
        entry.kind = draft.kind;
        entry.title = draft.title;
        entry.details = draft.details;
        entry.reschedule(draft.scheduled_time);
    }
}
