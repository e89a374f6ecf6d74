use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::organizer::Organizer;
use crate::reminder::ReminderSink;

/// Shortest accepted check interval
pub const MIN_INTERVAL_SECS: u64 = 1;
/// Longest accepted check interval. Anything longer could skip a whole minute.
pub const MAX_INTERVAL_SECS: u64 = 59;

pub fn clamp_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS))
}

/// Background thread that evaluates reminders every `interval`.
///
/// Stops when [`Scheduler::stop`] is called or the handle is dropped. An
/// evaluation in progress always finishes before the thread exits.
pub struct Scheduler {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start<S>(organizer: Organizer, interval: Duration, sink: S) -> io::Result<Self>
    where
        S: ReminderSink + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("reminders".to_string())
            .spawn(move || run_loop(organizer, interval, sink, stopped))?;

        tracing::info!(interval_ms = interval.as_millis() as u64, "reminder scheduler started");
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("reminder scheduler panicked");
            } else {
                tracing::info!("reminder scheduler stopped");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<S: ReminderSink>(organizer: Organizer, interval: Duration, mut sink: S, stopped: Receiver<()>) {
    loop {
        let evaluation = organizer.evaluate(&mut sink);
        if evaluation.changed() {
            tracing::debug!(
                fired = evaluation.fired.len(),
                archived = evaluation.archived.len(),
                "reminder check changed entries"
            );
        }

        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;
    use crate::reminder::{Notice, ReminderEngine};
    use crate::validation::EntryDraft;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::time::Instant;
    use tempfile::TempDir;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 14)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    fn organizer(dir: &TempDir) -> Organizer {
        Organizer::open(dir.path().join("entries.json"), ReminderEngine::default())
            .unwrap()
            .with_clock(noon)
    }

    #[test]
    fn intervals_are_clamped_below_a_minute() {
        assert_eq!(clamp_interval(0), Duration::from_secs(1));
        assert_eq!(clamp_interval(30), Duration::from_secs(30));
        assert_eq!(clamp_interval(600), Duration::from_secs(59));
    }

    #[test]
    fn due_reminders_reach_the_sink_and_are_saved() {
        let dir = TempDir::new().unwrap();
        let shared = organizer(&dir);
        let draft = EntryDraft::new(EntryKind::Appointment, "Standup")
            .scheduled(Some(noon()))
            .validate()
            .unwrap();
        let entry = shared.create(draft);

        let (tx, rx) = mpsc::channel();
        let mut scheduler = Scheduler::start(shared.clone(), Duration::from_millis(10), tx).unwrap();

        let notice = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(notice, Notice::ReminderDue(ref e) if e.id == entry.id));
        scheduler.stop();
        assert!(!scheduler.is_running());

        assert!(rx.try_recv().is_err());
        assert!(organizer(&dir).get(entry.id).unwrap().notified);
    }

    #[test]
    fn stop_does_not_wait_for_the_interval() {
        let dir = TempDir::new().unwrap();
        let mut scheduler =
            Scheduler::start(organizer(&dir), Duration::from_secs(59), crate::reminder::NullSink).unwrap();

        let started = Instant::now();
        scheduler.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn dropping_the_handle_stops_the_thread() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel::<Notice>();
        let scheduler = Scheduler::start(organizer(&dir), Duration::from_millis(10), tx).unwrap();
        drop(scheduler);

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)),
            Err(RecvTimeoutError::Disconnected)
        );
    }
}
