use chrono::{NaiveDateTime, TimeDelta};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::models::{Entry, EntryId};
use crate::reminder::{self, Evaluation, ReminderEngine, ReminderSink};
use crate::store::{Store, StoreError};
use crate::utils::local_now;
use crate::validation::{ValidatedDraft, ValidationError};
use crate::views::{View, ViewItem};

#[derive(Debug, Error)]
pub enum OrganizerError {
    #[error("No entry with id {0}")]
    NotFound(EntryId),
    #[error("No entry matches '{0}'")]
    NoMatch(String),
    #[error("'{prefix}' matches {count} entries, use more characters")]
    AmbiguousId { prefix: String, count: usize },
    #[error("'{0}' is too far overdue to be restored")]
    NotRestorable(String),
    #[error("Cannot snooze for {0} minutes")]
    SnoozeOutOfRange(i64),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Source of "now" for every time-dependent decision
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

struct Shared {
    entries: Vec<Entry>,
    store: Store,
    /// Set while the in-memory collection is ahead of the file
    dirty: bool,
}

impl Shared {
    /// Write the whole collection. Failures keep the collection in memory and
    /// leave it dirty so the next change retries.
    fn commit(&mut self) {
        match self.store.save(&self.entries) {
            Ok(()) => {
                if self.dirty {
                    tracing::info!(path = %self.store.path().display(), "pending changes saved");
                }
                self.dirty = false;
            }
            Err(e) => {
                tracing::error!(path = %self.store.path().display(), error = %e, "failed to save entries");
                self.dirty = true;
            }
        }
    }

    fn position(&self, id: EntryId) -> Result<usize, OrganizerError> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(OrganizerError::NotFound(id))
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut Entry, OrganizerError> {
        let index = self.position(id)?;
        Ok(&mut self.entries[index])
    }
}

/// The entry collection shared by the front end and the scheduler.
///
/// Every operation takes one lock, applies its change, and saves the whole
/// collection before returning. Cloning yields another handle to the same
/// collection.
#[derive(Clone)]
pub struct Organizer {
    shared: Arc<Mutex<Shared>>,
    engine: ReminderEngine,
    clock: Clock,
}

impl Organizer {
    /// Open (or create) the store at `path` and load it
    pub fn open(path: impl Into<PathBuf>, engine: ReminderEngine) -> Result<Self, OrganizerError> {
        Ok(Self::new(Store::open(path)?, engine))
    }

    pub fn new(store: Store, engine: ReminderEngine) -> Self {
        let entries = store.load();
        tracing::info!(
            path = %store.path().display(),
            count = entries.len(),
            "loaded entries"
        );

        Self {
            shared: Arc::new(Mutex::new(Shared {
                entries,
                store,
                dirty: false,
            })),
            engine,
            clock: Arc::new(local_now),
        }
    }

    /// Replace the wall clock, mostly for tests
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn store_path(&self) -> PathBuf {
        self.lock().store.path().to_path_buf()
    }

    /// Whether the last save failed and changes are only held in memory
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the whole collection in order
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().entries.clone()
    }

    pub fn get(&self, id: EntryId) -> Option<Entry> {
        self.lock().entries.iter().find(|e| e.id == id).cloned()
    }

    /// Find the single entry whose id starts with `prefix`
    pub fn resolve(&self, prefix: &str) -> Result<EntryId, OrganizerError> {
        let shared = self.lock();
        if let Ok(id) = prefix.parse::<EntryId>() {
            if shared.entries.iter().any(|e| e.id == id) {
                return Ok(id);
            }
        }

        let matches: Vec<EntryId> = shared
            .entries
            .iter()
            .filter(|e| e.id.matches_prefix(prefix))
            .map(|e| e.id)
            .collect();

        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(OrganizerError::NoMatch(prefix.to_string())),
            _ => Err(OrganizerError::AmbiguousId {
                prefix: prefix.to_string(),
                count: matches.len(),
            }),
        }
    }

    /// Entries shown in `view`. Overdue entries are archived first so no view
    /// ever lists them as active.
    pub fn view(&self, view: View) -> Vec<ViewItem> {
        let now = self.now();
        let mut shared = self.lock();

        let archived = self.engine.auto_archive(&mut shared.entries, now);
        if !archived.is_empty() || shared.dirty {
            shared.commit();
        }

        view.filter(&shared.entries, now)
            .into_iter()
            .map(|entry| ViewItem {
                restorable: self.engine.is_restorable(entry, now),
                entry: entry.clone(),
            })
            .collect()
    }

    pub fn create(&self, draft: ValidatedDraft) -> Entry {
        let entry = draft.into_entry();
        let mut shared = self.lock();
        shared.entries.push(entry.clone());
        shared.commit();
        tracing::info!(id = %entry.id, kind = %entry.kind, "entry created");
        entry
    }

    /// Replace the editable fields of an entry and re-arm its reminder
    pub fn update(&self, id: EntryId, draft: ValidatedDraft) -> Result<Entry, OrganizerError> {
        let mut shared = self.lock();
        let entry = shared.entry_mut(id)?;
        draft.apply_to(entry);
        let updated = entry.clone();
        shared.commit();
        tracing::info!(id = %id, "entry updated");
        Ok(updated)
    }

    pub fn archive(&self, id: EntryId) -> Result<Entry, OrganizerError> {
        self.modify(id, |entry| entry.archived = true)
    }

    /// Move an archived entry back, unless it is too far overdue
    pub fn unarchive(&self, id: EntryId) -> Result<Entry, OrganizerError> {
        let now = self.now();
        let mut shared = self.lock();
        let entry = shared.entry_mut(id)?;
        if !self.engine.is_restorable(entry, now) {
            return Err(OrganizerError::NotRestorable(entry.title.clone()));
        }
        entry.archived = false;
        let restored = entry.clone();
        shared.commit();
        Ok(restored)
    }

    pub fn delete(&self, id: EntryId) -> Result<Entry, OrganizerError> {
        let mut shared = self.lock();
        let index = shared.position(id)?;
        let removed = shared.entries.remove(index);
        shared.commit();
        tracing::info!(id = %id, "entry deleted");
        Ok(removed)
    }

    /// Fire again `delta` from now. Returns the new reminder time.
    pub fn snooze(&self, id: EntryId, delta: TimeDelta) -> Result<NaiveDateTime, OrganizerError> {
        let now = self.now();
        let mut shared = self.lock();
        let next = reminder::snooze(shared.entry_mut(id)?, now, delta)
            .ok_or(OrganizerError::SnoozeOutOfRange(delta.num_minutes()))?;
        shared.commit();
        tracing::info!(id = %id, until = %next, "reminder snoozed");
        Ok(next)
    }

    pub fn mark_done(&self, id: EntryId) -> Result<Entry, OrganizerError> {
        self.modify(id, reminder::mark_done)
    }

    /// One engine cycle at the current time.
    ///
    /// `sink` runs while the collection is locked and must not call back into
    /// the organizer.
    pub fn evaluate(&self, sink: &mut dyn ReminderSink) -> Evaluation {
        let now = self.now();
        let mut shared = self.lock();
        let evaluation = self.engine.evaluate(&mut shared.entries, now, sink);
        if evaluation.changed() || shared.dirty {
            shared.commit();
        }
        evaluation
    }

    /// Save now, reporting the error instead of only logging it
    pub fn persist(&self) -> Result<(), OrganizerError> {
        let mut shared = self.lock();
        shared.store.save(&shared.entries)?;
        shared.dirty = false;
        Ok(())
    }

    fn modify(&self, id: EntryId, change: impl FnOnce(&mut Entry)) -> Result<Entry, OrganizerError> {
        let mut shared = self.lock();
        let entry = shared.entry_mut(id)?;
        change(entry);
        let changed = entry.clone();
        shared.commit();
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;
    use crate::reminder::NullSink;
    use crate::validation::EntryDraft;
    use chrono::NaiveDate;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 14)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    struct Fixture {
        dir: TempDir,
        now: Arc<Mutex<NaiveDateTime>>,
        organizer: Organizer,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let now = Arc::new(Mutex::new(start()));
            let organizer = Self::open_at(&dir, &now);
            Self { dir, now, organizer }
        }

        fn open_at(dir: &TempDir, now: &Arc<Mutex<NaiveDateTime>>) -> Organizer {
            let clock = Arc::clone(now);
            Organizer::open(dir.path().join("data").join("entries.json"), ReminderEngine::default())
                .unwrap()
                .with_clock(move || *clock.lock().unwrap())
        }

        fn reopen(&self) -> Organizer {
            Self::open_at(&self.dir, &self.now)
        }

        fn advance(&self, delta: TimeDelta) {
            *self.now.lock().unwrap() += delta;
        }

        fn appointment(&self, title: &str, offset: TimeDelta) -> Entry {
            let draft = EntryDraft::new(EntryKind::Appointment, title)
                .scheduled(Some(start() + offset))
                .validate()
                .unwrap();
            self.organizer.create(draft)
        }
    }

    #[test]
    fn created_entries_are_persisted() {
        let fx = Fixture::new();
        let entry = fx.appointment("Dentist", TimeDelta::hours(2));

        let reloaded = fx.reopen().entries();
        assert_eq!(reloaded, vec![entry]);
        assert!(!fx.organizer.is_dirty());
    }

    #[test]
    fn update_rearms_the_reminder() {
        let fx = Fixture::new();
        let entry = fx.appointment("Dentist", TimeDelta::zero());
        assert_eq!(fx.organizer.evaluate(&mut NullSink).fired.len(), 1);

        let draft = EntryDraft::from_entry(&entry)
            .scheduled(Some(start() + TimeDelta::hours(1)))
            .validate()
            .unwrap();
        let updated = fx.organizer.update(entry.id, draft).unwrap();

        assert!(!updated.notified);
        assert_eq!(updated.reminder_time, Some(start() + TimeDelta::hours(1)));
        assert_eq!(fx.reopen().get(entry.id), Some(updated));
    }

    #[test]
    fn evaluation_fires_once_and_persists() {
        let fx = Fixture::new();
        let entry = fx.appointment("Standup", TimeDelta::zero());

        let mut fired = Vec::new();
        fx.organizer.evaluate(&mut fired);
        fx.advance(TimeDelta::seconds(30));
        fx.organizer.evaluate(&mut fired);

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, entry.id);
        assert!(fx.reopen().get(entry.id).unwrap().notified);
    }

    #[test]
    fn snoozed_reminders_fire_again() {
        let fx = Fixture::new();
        let entry = fx.appointment("Standup", TimeDelta::zero());
        fx.organizer.evaluate(&mut NullSink);

        let until = fx.organizer.snooze(entry.id, TimeDelta::minutes(5)).unwrap();
        assert_eq!(until, start() + TimeDelta::minutes(5));
        assert!(!fx.organizer.get(entry.id).unwrap().notified);

        fx.advance(TimeDelta::minutes(4));
        assert!(fx.organizer.evaluate(&mut NullSink).fired.is_empty());
        fx.advance(TimeDelta::minutes(1));
        assert_eq!(fx.organizer.evaluate(&mut NullSink).fired.len(), 1);
    }

    #[test]
    fn oversized_snooze_is_an_error() {
        let fx = Fixture::new();
        let entry = fx.appointment("Standup", TimeDelta::zero());
        fx.organizer.evaluate(&mut NullSink);
        let before = fx.organizer.get(entry.id).unwrap();

        let result = fx.organizer.snooze(entry.id, TimeDelta::minutes(200_000_000_000));
        assert!(matches!(result, Err(OrganizerError::SnoozeOutOfRange(200_000_000_000))));
        assert_eq!(fx.organizer.get(entry.id).unwrap(), before);
        assert_eq!(fx.reopen().get(entry.id).unwrap(), before);
    }

    #[test]
    fn done_entries_leave_every_active_view() {
        let fx = Fixture::new();
        let entry = fx.appointment("Standup", TimeDelta::hours(1));

        let done = fx.organizer.mark_done(entry.id).unwrap();
        assert!(done.done && done.archived && done.notified);
        assert!(fx.organizer.view(View::All).is_empty());
        assert_eq!(fx.organizer.view(View::Archive).len(), 1);
    }

    #[test]
    fn views_archive_overdue_entries_first() {
        let fx = Fixture::new();
        let entry = fx.appointment("Dentist", TimeDelta::zero());

        fx.advance(TimeDelta::hours(25));
        assert!(fx.organizer.view(View::All).is_empty());

        let archive = fx.organizer.view(View::Archive);
        assert_eq!(archive.len(), 1);
        assert!(!archive[0].restorable);
        assert!(fx.reopen().get(entry.id).unwrap().archived);
    }

    #[test]
    fn restore_is_refused_once_too_old() {
        let fx = Fixture::new();
        let entry = fx.appointment("Dentist", TimeDelta::zero());
        fx.organizer.archive(entry.id).unwrap();

        fx.advance(TimeDelta::hours(23));
        assert!(fx.organizer.view(View::Archive)[0].restorable);
        assert!(!fx.organizer.unarchive(entry.id).unwrap().archived);

        fx.organizer.archive(entry.id).unwrap();
        fx.advance(TimeDelta::hours(2));
        assert!(matches!(
            fx.organizer.unarchive(entry.id),
            Err(OrganizerError::NotRestorable(_))
        ));
    }

    #[test]
    fn delete_removes_the_entry() {
        let fx = Fixture::new();
        let entry = fx.appointment("Dentist", TimeDelta::hours(1));

        assert_eq!(fx.organizer.delete(entry.id).unwrap().id, entry.id);
        assert!(fx.reopen().entries().is_empty());
        assert!(matches!(
            fx.organizer.delete(entry.id),
            Err(OrganizerError::NotFound(_))
        ));
    }

    #[test]
    fn ids_resolve_from_prefixes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entries.json");
        fs::write(
            &path,
            r#"[
                {"id": "aaaa1111-0000-4000-8000-000000000000", "type": "idea", "title": "one"},
                {"id": "aaaa2222-0000-4000-8000-000000000000", "type": "idea", "title": "two"}
            ]"#,
        )
        .unwrap();
        let organizer = Organizer::open(&path, ReminderEngine::default()).unwrap();

        let two = organizer.resolve("aaaa2").unwrap();
        assert_eq!(organizer.get(two).unwrap().title, "two");
        assert_eq!(
            organizer.resolve("aaaa2222-0000-4000-8000-000000000000").unwrap(),
            two
        );
        assert!(matches!(
            organizer.resolve("aaaa"),
            Err(OrganizerError::AmbiguousId { count: 2, .. })
        ));
        assert!(matches!(organizer.resolve("ffff"), Err(OrganizerError::NoMatch(_))));
    }

    #[test]
    fn failed_saves_are_retried() {
        let fx = Fixture::new();
        let data = fx.dir.path().join("data");
        fs::remove_dir_all(&data).unwrap();
        fs::write(&data, "in the way").unwrap();

        fx.appointment("Dentist", TimeDelta::hours(1));
        assert!(fx.organizer.is_dirty());
        assert_eq!(fx.organizer.entries().len(), 1);

        fs::remove_file(&data).unwrap();
        fs::create_dir(&data).unwrap();
        fx.appointment("Barber", TimeDelta::hours(2));

        assert!(!fx.organizer.is_dirty());
        assert_eq!(fx.reopen().entries().len(), 2);
    }

    #[test]
    fn concurrent_writers_do_not_lose_entries() {
        let fx = Fixture::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let organizer = fx.organizer.clone();
                thread::spawn(move || {
                    let draft = EntryDraft::new(EntryKind::Idea, format!("idea {}", i))
                        .validate()
                        .unwrap();
                    organizer.create(draft);
                    organizer.evaluate(&mut NullSink);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(fx.organizer.entries().len(), 8);
        assert_eq!(fx.reopen().entries().len(), 8);
    }
}
