use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Entry, EntryKind};

/// The four ways the collection is listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    All,
    Next,
    Ideas,
    Archive,
}

impl View {
    pub const ALL: [View; 4] = [View::All, View::Next, View::Ideas, View::Archive];

    pub fn title(&self) -> &'static str {
        match self {
            View::All => "All",
            View::Next => "Next",
            View::Ideas => "Ideas",
            View::Archive => "Archive",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            View::All => 0,
            View::Next => 1,
            View::Ideas => 2,
            View::Archive => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Whether `entry` belongs in this view at `now`
    pub fn includes(&self, entry: &Entry, now: NaiveDateTime) -> bool {
        match self {
            View::All => !entry.archived,
            View::Next => !entry.archived && entry.scheduled_time.is_some_and(|t| t >= now),
            View::Ideas => !entry.archived && entry.kind == EntryKind::Idea,
            View::Archive => entry.archived,
        }
    }

    /// Filter `entries` in collection order. Next is sorted by schedule;
    /// ties keep collection order.
    pub fn filter<'a>(&self, entries: &'a [Entry], now: NaiveDateTime) -> Vec<&'a Entry> {
        let mut selected: Vec<&Entry> = entries.iter().filter(|e| self.includes(e, now)).collect();
        if *self == View::Next {
            selected.sort_by_key(|e| e.scheduled_time);
        }
        selected
    }

    /// Text shown when the view has nothing to list
    pub fn empty_message(&self) -> &'static str {
        match self {
            View::All => "Nothing here yet. Press 'n' to add an entry.",
            View::Next => "Nothing coming up.",
            View::Ideas => "No ideas yet.",
            View::Archive => "The archive is empty.",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(View::All),
            "next" => Ok(View::Next),
            "ideas" | "idea" => Ok(View::Ideas),
            "archive" | "archived" => Ok(View::Archive),
            other => Err(format!(
                "unknown view '{}' (expected all, next, ideas or archive)",
                other
            )),
        }
    }
}

/// An entry as listed in a view, with the actions it currently allows
#[derive(Debug, Clone, PartialEq)]
pub struct ViewItem {
    pub entry: Entry,
    /// Only meaningful in the Archive view
    pub restorable: bool,
}
