use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier assigned when an entry is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to name an entry on the command line
    pub fn short(&self) -> String {
        let mut simple = self.0.simple().to_string();
        simple.truncate(8);
        simple
    }

    /// Whether `prefix` (hyphens ignored, case-insensitive) starts this id
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let prefix: String = prefix
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        !prefix.is_empty() && self.0.simple().to_string().starts_with(&prefix)
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Idea,
    Task,
    Appointment,
}

impl EntryKind {
    pub const ALL: [EntryKind; 3] = [EntryKind::Idea, EntryKind::Task, EntryKind::Appointment];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Idea => "idea",
            EntryKind::Task => "task",
            EntryKind::Appointment => "appointment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Idea => "Idea",
            EntryKind::Task => "Task",
            EntryKind::Appointment => "Appointment",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "idea" => Some(EntryKind::Idea),
            "task" => Some(EntryKind::Task),
            "appointment" => Some(EntryKind::Appointment),
            _ => None,
        }
    }

    /// Next kind in display order, wrapping around
    pub fn next(self) -> Self {
        match self {
            EntryKind::Idea => EntryKind::Task,
            EntryKind::Task => EntryKind::Appointment,
            EntryKind::Appointment => EntryKind::Idea,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            EntryKind::Idea => EntryKind::Appointment,
            EntryKind::Task => EntryKind::Idea,
            EntryKind::Appointment => EntryKind::Task,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            format!("unknown entry type '{}' (expected idea, task or appointment)", s)
        })
    }
}

/// One idea, task or appointment.
///
/// `reminder_time` is the next instant a reminder fires. It starts equal to
/// `scheduled_time` and only diverges after a snooze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryRecord", into = "EntryRecord")]
pub struct Entry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub title: String,
    pub details: String,
    pub scheduled_time: Option<NaiveDateTime>,
    pub done: bool,
    pub archived: bool,
    pub notified: bool,
    pub reminder_time: Option<NaiveDateTime>,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("Failed to decode entry: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Entry {
    pub fn new(kind: EntryKind, title: String) -> Self {
        Self {
            id: EntryId::new(),
            kind,
            title,
            details: String::new(),
            scheduled_time: None,
            done: false,
            archived: false,
            notified: false,
            reminder_time: None,
        }
    }

    /// Set the schedule and point the reminder at it, discarding any pending snooze
    pub fn reschedule(&mut self, scheduled_time: Option<NaiveDateTime>) {
        self.scheduled_time = scheduled_time;
        self.reminder_time = scheduled_time;
        self.notified = false;
    }

    /// Flat record as written to the store
    pub fn to_record(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Tolerant parse of a stored record.
    ///
    /// Individual fields degrade to their defaults; only a record that is not
    /// an object at all is rejected.
    pub fn from_record(record: &Value) -> Result<Self, RecordError> {
        if !record.is_object() {
            return Err(RecordError::NotAnObject(json_type_name(record)));
        }
        Ok(Entry::deserialize(record)?)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// On-disk shape of an entry
#[derive(Serialize, Deserialize)]
struct EntryRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    id: Option<EntryId>,
    #[serde(rename = "type", default, deserialize_with = "lenient::kind")]
    kind: EntryKind,
    #[serde(default, deserialize_with = "lenient::text")]
    title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    details: String,
    #[serde(
        default,
        serialize_with = "lenient::write_timestamp",
        deserialize_with = "lenient::timestamp"
    )]
    time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::flag")]
    done: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    archived: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    notified: bool,
    #[serde(
        default,
        serialize_with = "lenient::write_timestamp",
        deserialize_with = "lenient::timestamp"
    )]
    reminder_time: Option<NaiveDateTime>,
}

impl From<EntryRecord> for Entry {
    fn from(record: EntryRecord) -> Self {
        // Ideas never carry a schedule; older records may default the reminder to the schedule.
        let (scheduled_time, reminder_time) = match record.kind {
            EntryKind::Idea => (None, None),
            _ => (record.time, record.reminder_time.or(record.time)),
        };

        Self {
            id: record.id.unwrap_or_default(),
            kind: record.kind,
            title: record.title,
            details: record.details,
            scheduled_time,
            done: record.done,
            archived: record.archived,
            notified: record.notified,
            reminder_time,
        }
    }
}

impl From<Entry> for EntryRecord {
    fn from(entry: Entry) -> Self {
        Self {
            id: Some(entry.id),
            kind: entry.kind,
            title: entry.title,
            details: entry.details,
            time: entry.scheduled_time,
            done: entry.done,
            archived: entry.archived,
            notified: entry.notified,
            reminder_time: entry.reminder_time,
        }
    }
}

/// Field decoders that never fail on a well-formed JSON value
mod lenient {
    use super::{EntryId, EntryKind};
    use crate::utils::{format_timestamp, parse_timestamp};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<EntryId>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value.as_str().and_then(|s| s.parse().ok()))
    }

    pub fn kind<'de, D: Deserializer<'de>>(d: D) -> Result<EntryKind, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value
            .as_str()
            .and_then(EntryKind::from_name)
            .unwrap_or_default())
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value.as_str().map(str::to_owned).unwrap_or_default())
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(value.as_str().and_then(parse_timestamp))
    }

    pub fn write_timestamp<S: Serializer>(
        time: &Option<NaiveDateTime>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => s.serialize_str(&format_timestamp(time)),
            None => s.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 14)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .unwrap()
    }

    fn appointment() -> Entry {
        let mut entry = Entry::new(EntryKind::Appointment, "Dentist".to_string());
        entry.details = "Bring the insurance card".to_string();
        entry.reschedule(Some(at(14, 30)));
        entry
    }

    #[test]
    fn record_round_trip_preserves_every_field() {
        let mut snoozed = appointment();
        snoozed.notified = true;
        snoozed.reminder_time = Some(at(14, 40));

        let mut done_task = Entry::new(EntryKind::Task, "File taxes".to_string());
        done_task.done = true;
        done_task.archived = true;

        let idea = Entry::new(EntryKind::Idea, "Learn the cello".to_string());

        for entry in [appointment(), snoozed, done_task, idea] {
            let record = entry.to_record().unwrap();
            assert_eq!(Entry::from_record(&record).unwrap(), entry);
        }
    }

    #[test]
    fn record_uses_stored_field_names() {
        let record = appointment().to_record().unwrap();
        assert_eq!(record["type"], "appointment");
        assert_eq!(record["time"], "2025-06-14T14:30:00");
        assert_eq!(record["reminder_time"], "2025-06-14T14:30:00");
        assert_eq!(record["done"], false);

        let idea = Entry::new(EntryKind::Idea, "x".to_string()).to_record().unwrap();
        assert!(idea["time"].is_null());
        assert!(idea["reminder_time"].is_null());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let entry = Entry::from_record(&json!({})).unwrap();
        assert_eq!(entry.kind, EntryKind::Idea);
        assert!(entry.title.is_empty());
        assert!(entry.details.is_empty());
        assert!(!entry.done && !entry.archived && !entry.notified);
        assert_eq!(entry.scheduled_time, None);
    }

    #[test]
    fn malformed_fields_degrade_individually() {
        let entry = Entry::from_record(&json!({
            "type": "meeting",
            "title": 42,
            "details": "kept",
            "time": "not a time",
            "done": "yes",
            "archived": true,
            "id": "nope",
        }))
        .unwrap();

        assert_eq!(entry.kind, EntryKind::Idea);
        assert!(entry.title.is_empty());
        assert_eq!(entry.details, "kept");
        assert!(!entry.done);
        assert!(entry.archived);
        assert_eq!(entry.scheduled_time, None);
    }

    #[test]
    fn missing_reminder_time_defaults_to_schedule() {
        let entry = Entry::from_record(&json!({
            "type": "task",
            "title": "Call mom",
            "details": "",
            "time": "2025-06-14T14:30:00",
        }))
        .unwrap();
        assert_eq!(entry.reminder_time, Some(at(14, 30)));

        let corrupt_reminder = Entry::from_record(&json!({
            "type": "task",
            "time": "2025-06-14T14:30:00",
            "reminder_time": "garbage",
        }))
        .unwrap();
        assert_eq!(corrupt_reminder.reminder_time, Some(at(14, 30)));
    }

    #[test]
    fn ideas_drop_stray_schedules() {
        let entry = Entry::from_record(&json!({
            "type": "idea",
            "time": "2025-06-14T14:30:00",
            "reminder_time": "2025-06-14T14:30:00",
        }))
        .unwrap();
        assert_eq!(entry.scheduled_time, None);
        assert_eq!(entry.reminder_time, None);
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(matches!(
            Entry::from_record(&json!("hello")),
            Err(RecordError::NotAnObject("a string"))
        ));
        assert!(Entry::from_record(&json!([1, 2])).is_err());
    }

    #[test]
    fn ids_survive_and_match_prefixes() {
        let entry = appointment();
        let restored = Entry::from_record(&entry.to_record().unwrap()).unwrap();
        assert_eq!(restored.id, entry.id);

        let short = entry.id.short();
        assert_eq!(short.len(), 8);
        assert!(entry.id.matches_prefix(&short));
        assert!(entry.id.matches_prefix(&short.to_uppercase()));
        assert!(!entry.id.matches_prefix(""));
    }

    #[test]
    fn reschedule_clears_snooze_state() {
        let mut entry = appointment();
        entry.notified = true;
        entry.reminder_time = Some(at(15, 0));

        entry.reschedule(Some(at(16, 0)));
        assert!(!entry.notified);
        assert_eq!(entry.reminder_time, Some(at(16, 0)));
    }

    #[test]
    fn kinds_parse_from_names() {
        assert_eq!("Appointment".parse::<EntryKind>().unwrap(), EntryKind::Appointment);
        assert!("chore".parse::<EntryKind>().is_err());
        assert_eq!(EntryKind::Appointment.next(), EntryKind::Idea);
        assert_eq!(EntryKind::Idea.previous(), EntryKind::Appointment);
    }
}
