use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::Entry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create store directory: {0}")]
    DirectoryError(String),
    #[error("Failed to write temporary file in {dir}: {source}")]
    TempFile {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize entries: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to replace {path}: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// JSON file holding the whole entry collection.
///
/// Writes go to a temporary file next to the target which is then renamed
/// over it, so readers see either the old or the new file, never a torn one.
/// There is no locking between processes: one running instance is assumed to
/// own the file.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

/// A fully written temporary file waiting to replace the store file.
/// Dropping it without committing removes the temporary file.
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl Store {
    /// Open the store at `path`, creating parent directories and an empty
    /// collection if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self { path: path.into() };

        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::DirectoryError(e.to_string()))?;
            }
        }

        if !store.path.exists() {
            store.save(&[])?;
            tracing::info!(path = %store.path.display(), "created empty entry store");
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every readable entry.
    ///
    /// A file that is not a JSON array is replaced by an empty one (its
    /// contents are lost). Records that are not objects are skipped. Never
    /// fails: unreadable files yield an empty collection.
    pub fn load(&self) -> Vec<Entry> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Err(e) = self.save(&[]) {
                    tracing::error!(path = %self.path.display(), error = %e, "failed to create entry store");
                }
                return Vec::new();
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to read entries");
                return Vec::new();
            }
        };

        let records = match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(records)) => records,
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "entry store is not a list, resetting it");
                self.reset();
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "entry store is corrupted, resetting it");
                self.reset();
                return Vec::new();
            }
        };

        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match Entry::from_record(record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping invalid entry");
                    None
                }
            })
            .collect()
    }

    /// Atomically replace the store file with `entries`
    pub fn save(&self, entries: &[Entry]) -> Result<(), StoreError> {
        self.stage(entries)?.commit()
    }

    /// Write `entries` to a temporary file in the store's directory without
    /// touching the store file yet
    pub fn stage(&self, entries: &[Entry]) -> Result<StagedWrite, StoreError> {
        let dir = self.directory();
        let temp_error = |source| StoreError::TempFile {
            dir: dir.to_path_buf(),
            source,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(".entries-")
            .suffix(".json.tmp")
            .tempfile_in(dir)
            .map_err(temp_error)?;

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            let mut serializer =
                Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
            entries.serialize(&mut serializer)?;
            writer.flush().map_err(temp_error)?;
        }
        temp.as_file().sync_all().map_err(temp_error)?;

        Ok(StagedWrite {
            temp,
            target: self.path.clone(),
        })
    }

    fn reset(&self) {
        if let Err(e) = self.save(&[]) {
            tracing::error!(path = %self.path.display(), error = %e, "failed to reset entry store");
        }
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Rename the temporary file over the store file. On failure the
    /// temporary file is removed and the store file is left as it was.
    pub fn commit(self) -> Result<(), StoreError> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map(|_| ())
            .map_err(|e| StoreError::Replace {
                path: target.clone(),
                source: e.error,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> Store {
        Store::open(dir.path().join("data").join("entries.json")).unwrap()
    }

    fn sample(title: &str) -> Entry {
        let mut entry = Entry::new(EntryKind::Task, title.to_string());
        entry.reschedule(
            NaiveDate::from_ymd_opt(2025, 6, 14).and_then(|d| d.and_hms_opt(9, 0, 0)),
        );
        entry
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn open_creates_an_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
        assert!(store.load().is_empty());
    }

    #[test]
    fn missing_file_is_recreated_on_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::remove_file(store.path()).unwrap();

        assert!(store.load().is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test]
    fn save_then_load_keeps_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let entries = vec![sample("first"), sample("second"), sample("third")];

        store.save(&entries).unwrap();
        assert_eq!(store.load(), entries);
    }

    #[test]
    fn saved_file_is_an_indented_array() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&[sample("first")]).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("[\n    {\n"));
        assert!(text.contains("\"reminder_time\": \"2025-06-14T09:00:00\""));
    }

    #[test]
    fn malformed_records_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"[{"type": "task", "title": "kept", "details": "", "time": null,
                 "done": false, "archived": false, "notified": false, "reminder_time": null},
                "not an entry"]"#,
        )
        .unwrap();

        let entries = store.load();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "kept");
    }

    #[test]
    fn corrupted_file_is_reset() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "this is { not json").unwrap();

        assert!(store.load().is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test]
    fn non_list_json_is_reset() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"title": "lonely"}"#).unwrap();

        assert!(store.load().is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[test]
    fn interrupted_save_leaves_original_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&[sample("original")]).unwrap();
        let before = fs::read(store.path()).unwrap();

        let staged = store.stage(&[sample("replacement")]).unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        assert_eq!(temp_path.parent(), store.path().parent());
        drop(staged);

        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(!temp_path.exists());
        assert_eq!(files_in(store.path().parent().unwrap()), vec!["entries.json"]);
    }

    #[test]
    fn failed_replace_cleans_up_the_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("entries.json");
        fs::create_dir(&target).unwrap();
        let store = Store::open(&target).unwrap();

        let err = store.save(&[sample("nowhere")]).unwrap_err();
        assert!(matches!(err, StoreError::Replace { .. }));
        assert_eq!(files_in(dir.path()), vec!["entries.json"]);
    }
}
