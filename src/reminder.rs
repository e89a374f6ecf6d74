use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

use crate::models::Entry;
use crate::utils::truncate_to_minute;

/// When a pending reminder counts as due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FirePolicy {
    /// Fire only during the reminder's own minute. A sample that misses that
    /// minute (suspended machine, stalled loop) loses the reminder.
    ExactMinute,
    /// Fire at the first evaluation at or after the reminder's minute
    #[default]
    CatchUp,
}

/// Receives engine decisions synchronously while an evaluation runs
pub trait ReminderSink {
    fn reminder_due(&mut self, entry: &Entry);

    fn entry_archived(&mut self, _entry: &Entry) {}
}

/// Engine output forwarded across threads
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ReminderDue(Entry),
    Archived(Entry),
}

impl ReminderSink for Sender<Notice> {
    fn reminder_due(&mut self, entry: &Entry) {
        if self.send(Notice::ReminderDue(entry.clone())).is_err() {
            tracing::debug!(id = %entry.id, "reminder receiver is gone");
        }
    }

    fn entry_archived(&mut self, entry: &Entry) {
        if self.send(Notice::Archived(entry.clone())).is_err() {
            tracing::debug!(id = %entry.id, "archive receiver is gone");
        }
    }
}

/// Collects fired reminders
impl ReminderSink for Vec<Entry> {
    fn reminder_due(&mut self, entry: &Entry) {
        self.push(entry.clone());
    }
}

/// Discards everything
pub struct NullSink;

impl ReminderSink for NullSink {
    fn reminder_due(&mut self, _entry: &Entry) {}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub fired: Vec<Entry>,
    pub archived: Vec<Entry>,
}

impl Evaluation {
    pub fn changed(&self) -> bool {
        !self.fired.is_empty() || !self.archived.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderEngine {
    archive_after: TimeDelta,
    policy: FirePolicy,
}

impl Default for ReminderEngine {
    fn default() -> Self {
        Self {
            archive_after: TimeDelta::hours(24),
            policy: FirePolicy::default(),
        }
    }
}

impl ReminderEngine {
    pub fn new(archive_after: TimeDelta, policy: FirePolicy) -> Self {
        Self {
            archive_after,
            policy,
        }
    }

    pub fn policy(&self) -> FirePolicy {
        self.policy
    }

    pub fn archive_after(&self) -> TimeDelta {
        self.archive_after
    }

    /// Run one evaluation cycle at `now`.
    ///
    /// Overdue entries are archived first, then every pending reminder that is
    /// due is reported to `sink` and marked notified. Flags are updated in
    /// place; the returned snapshots reflect the state after the update.
    pub fn evaluate(
        &self,
        entries: &mut [Entry],
        now: NaiveDateTime,
        sink: &mut dyn ReminderSink,
    ) -> Evaluation {
        let now = truncate_to_minute(now);

        let archived = self.auto_archive(entries, now);
        for entry in &archived {
            sink.entry_archived(entry);
        }

        let mut fired = Vec::new();
        for entry in entries.iter_mut().filter(|e| self.is_due(e, now)) {
            sink.reminder_due(entry);
            entry.notified = true;
            tracing::info!(id = %entry.id, title = %entry.title, "reminder fired");
            fired.push(entry.clone());
        }

        Evaluation { fired, archived }
    }

    /// Archive every entry scheduled more than `archive_after` before `now`
    pub fn auto_archive(&self, entries: &mut [Entry], now: NaiveDateTime) -> Vec<Entry> {
        let mut archived = Vec::new();
        for entry in entries
            .iter_mut()
            .filter(|e| !e.archived && self.is_overdue(e, now))
        {
            entry.archived = true;
            tracing::info!(id = %entry.id, title = %entry.title, "auto-archived overdue entry");
            archived.push(entry.clone());
        }
        archived
    }

    pub fn is_overdue(&self, entry: &Entry, now: NaiveDateTime) -> bool {
        entry
            .scheduled_time
            .is_some_and(|scheduled| now - scheduled > self.archive_after)
    }

    /// Restoring is offered until the entry is past the auto-archive age
    pub fn is_restorable(&self, entry: &Entry, now: NaiveDateTime) -> bool {
        !self.is_overdue(entry, now)
    }

    /// `now` must already be truncated to the minute
    fn is_due(&self, entry: &Entry, now: NaiveDateTime) -> bool {
        if entry.archived || entry.done || entry.notified {
            return false;
        }
        let Some(reminder) = entry.reminder_time else {
            return false;
        };

        let due = truncate_to_minute(reminder);
        match self.policy {
            FirePolicy::ExactMinute => due == now,
            FirePolicy::CatchUp => due <= now,
        }
    }
}

/// Push the reminder `delta` past `now` and re-arm it.
///
/// Returns `None` and leaves the entry alone when the new time is not
/// representable.
pub fn snooze(entry: &mut Entry, now: NaiveDateTime, delta: TimeDelta) -> Option<NaiveDateTime> {
    let next = now.checked_add_signed(delta)?;
    entry.reminder_time = Some(next);
    entry.notified = false;
    Some(next)
}

/// Acknowledge an entry: done, archived, and never reminded again
pub fn mark_done(entry: &mut Entry) {
    entry.done = true;
    entry.archived = true;
    entry.notified = true;
}
