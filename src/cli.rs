use clap::{Parser, Subcommand};
use chrono::TimeDelta;
use std::io::{self, BufRead, Write};
use thiserror::Error;

use crate::config::Config;
use crate::models::{Entry, EntryKind};
use crate::organizer::{Organizer, OrganizerError};
use crate::reminder::ReminderSink;
use crate::scheduler::Scheduler;
use crate::utils::format_when;
use crate::validation::{EntryDraft, ValidationError};
use crate::views::View;

#[derive(Parser)]
#[command(name = "calmmind")]
#[command(about = "CalmMind - ideas, tasks and appointments with gentle reminders")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/data)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Add an idea, task or appointment
    Add {
        /// Entry title
        title: String,
        /// idea, task or appointment
        #[arg(short, long, default_value = "idea")]
        kind: EntryKind,
        /// When it happens (YYYY-MM-DD HH:MM)
        #[arg(long)]
        at: Option<String>,
        /// Free-form details
        #[arg(long)]
        details: Option<String>,
    },
    /// List entries in a view
    List {
        /// all, next, ideas or archive
        #[arg(long, default_value = "all")]
        view: View,
    },
    /// Change an entry; its reminder is re-armed
    Edit {
        /// Entry id or unique id prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        kind: Option<EntryKind>,
        #[arg(long, conflicts_with = "clear_time")]
        at: Option<String>,
        #[arg(long)]
        details: Option<String>,
        /// Remove the date and time
        #[arg(long)]
        clear_time: bool,
    },
    /// Move an entry to the archive
    Archive {
        id: String,
    },
    /// Bring an archived entry back
    Restore {
        id: String,
    },
    /// Delete an entry for good
    Delete {
        id: String,
    },
    /// Mark an entry done (archives it and silences its reminder)
    Done {
        id: String,
    },
    /// Remind again later
    Snooze {
        id: String,
        #[arg(short, long, default_value_t = 5)]
        minutes: i64,
    },
    /// Run one reminder check and print what fired
    Check,
    /// Check reminders in the foreground until Enter is pressed
    Watch,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Organizer(#[from] OrganizerError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Snooze must be a positive number of minutes")]
    InvalidSnooze,
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// One list line: short id, kind, title, schedule and state
pub fn format_entry_line(entry: &Entry) -> String {
    let mut line = format!("{}  {:<11}  {}", entry.id.short(), entry.kind.label(), entry.title);
    if let Some(time) = &entry.scheduled_time {
        line.push_str(&format!("  @ {}", format_when(time)));
    }
    if let (Some(reminder), Some(time)) = (&entry.reminder_time, &entry.scheduled_time) {
        if reminder != time && !entry.notified {
            line.push_str(&format!("  (snoozed until {})", reminder.format("%H:%M")));
        }
    }
    if entry.done {
        line.push_str("  [done]");
    }
    line
}

/// Run a one-shot command against `organizer`, writing results to `out`
pub fn run(
    command: Commands,
    organizer: &Organizer,
    config: &Config,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        // Launched by the binary itself
        Commands::Tui => Ok(()),
        Commands::Add {
            title,
            kind,
            at,
            details,
        } => handle_add(title, kind, at, details, organizer, out),
        Commands::List { view } => handle_list(view, organizer, out),
        Commands::Edit {
            id,
            title,
            kind,
            at,
            details,
            clear_time,
        } => handle_edit(
            &id,
            EditArgs {
                title,
                kind,
                at,
                details,
                clear_time,
            },
            organizer,
            out,
        ),
        Commands::Archive { id } => {
            let entry = organizer.archive(organizer.resolve(&id)?)?;
            writeln!(out, "Archived: {}", entry.title)?;
            Ok(())
        }
        Commands::Restore { id } => {
            let entry = organizer.unarchive(organizer.resolve(&id)?)?;
            writeln!(out, "Restored: {}", entry.title)?;
            Ok(())
        }
        Commands::Delete { id } => {
            let entry = organizer.delete(organizer.resolve(&id)?)?;
            writeln!(out, "Deleted: {}", entry.title)?;
            Ok(())
        }
        Commands::Done { id } => {
            let entry = organizer.mark_done(organizer.resolve(&id)?)?;
            writeln!(out, "Done: {}", entry.title)?;
            Ok(())
        }
        Commands::Snooze { id, minutes } => handle_snooze(&id, minutes, organizer, out),
        Commands::Check => handle_check(organizer, out),
        Commands::Watch => handle_watch(organizer, config, out),
    }
}

/// Handle the add command
pub fn handle_add(
    title: String,
    kind: EntryKind,
    at: Option<String>,
    details: Option<String>,
    organizer: &Organizer,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let draft = EntryDraft::new(kind, title)
        .details(details.unwrap_or_default())
        .scheduled_from_input(at.as_deref().unwrap_or(""))?
        .validate()?;

    let entry = organizer.create(draft);
    writeln!(out, "{} created (ID: {})", entry.kind.label(), entry.id.short())?;
    Ok(())
}

/// Handle the list command
pub fn handle_list(view: View, organizer: &Organizer, out: &mut impl Write) -> Result<(), CliError> {
    let items = organizer.view(view);
    if items.is_empty() {
        writeln!(out, "{}", view.empty_message())?;
        return Ok(());
    }

    for item in items {
        let mut line = format_entry_line(&item.entry);
        if view == View::Archive && !item.restorable {
            line.push_str("  (cannot be restored)");
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

pub struct EditArgs {
    pub title: Option<String>,
    pub kind: Option<EntryKind>,
    pub at: Option<String>,
    pub details: Option<String>,
    pub clear_time: bool,
}

/// Handle the edit command
pub fn handle_edit(
    id: &str,
    args: EditArgs,
    organizer: &Organizer,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let id = organizer.resolve(id)?;
    let existing = organizer.get(id).ok_or(OrganizerError::NotFound(id))?;

    let mut draft = EntryDraft::from_entry(&existing);
    if let Some(title) = args.title {
        draft.title = title;
    }
    if let Some(kind) = args.kind {
        draft.kind = kind;
        if kind == EntryKind::Idea {
            draft.scheduled_time = None;
        }
    }
    if let Some(details) = args.details {
        draft.details = details;
    }
    if args.clear_time {
        draft.scheduled_time = None;
    }
    if let Some(at) = args.at {
        draft = draft.scheduled_from_input(&at)?;
    }

    let entry = organizer.update(id, draft.validate()?)?;
    writeln!(out, "Updated: {}", format_entry_line(&entry))?;
    Ok(())
}

/// Handle the snooze command
pub fn handle_snooze(
    id: &str,
    minutes: i64,
    organizer: &Organizer,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let delta = TimeDelta::try_minutes(minutes)
        .filter(|_| minutes >= 1)
        .ok_or(CliError::InvalidSnooze)?;
    let id = organizer.resolve(id)?;
    let until = organizer.snooze(id, delta)?;
    writeln!(out, "Snoozed until {}", format_when(&until))?;
    Ok(())
}

/// Handle the check command
pub fn handle_check(organizer: &Organizer, out: &mut impl Write) -> Result<(), CliError> {
    let evaluation = organizer.evaluate(&mut crate::reminder::NullSink);

    for entry in &evaluation.archived {
        writeln!(out, "Archived (overdue): {}", entry.title)?;
    }
    for entry in &evaluation.fired {
        writeln!(out, "Reminder: {}", format_entry_line(entry))?;
    }
    if !evaluation.changed() {
        writeln!(out, "No reminders due.")?;
    }
    Ok(())
}

/// Prints reminders as they fire
struct ConsoleSink;

impl ReminderSink for ConsoleSink {
    fn reminder_due(&mut self, entry: &Entry) {
        println!("Reminder: {}", format_entry_line(entry));
    }

    fn entry_archived(&mut self, entry: &Entry) {
        println!("Archived (overdue): {}", entry.title);
    }
}

/// Handle the watch command
pub fn handle_watch(organizer: &Organizer, config: &Config, out: &mut impl Write) -> Result<(), CliError> {
    let interval = config.check_interval();
    writeln!(
        out,
        "Watching for reminders every {}s. Press Enter to stop.",
        interval.as_secs()
    )?;
    out.flush()?;

    let mut scheduler = Scheduler::start(organizer.clone(), interval, ConsoleSink)?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    scheduler.stop();

    Ok(())
}
