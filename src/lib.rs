pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod organizer;
pub mod reminder;
pub mod scheduler;
pub mod store;
pub mod tui;
pub mod utils;
pub mod validation;
pub mod views;

pub use config::Config;
pub use models::{Entry, EntryId, EntryKind};
pub use organizer::{Organizer, OrganizerError};
pub use reminder::{FirePolicy, Notice, ReminderEngine, ReminderSink};
pub use scheduler::Scheduler;
pub use store::{Store, StoreError};
pub use utils::Profile;
pub use validation::{EntryDraft, ValidatedDraft, ValidationError};
pub use views::{View, ViewItem};
