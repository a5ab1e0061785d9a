//! History storage backends.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::HistoryEntry;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("history I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("history file {} is not valid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistent list of past calculations.
pub trait HistoryStore: Send {
    /// Insert `entry`, assigning an id if it has none, or replace the entry
    /// with the same id. Returns the stored entry.
    fn insert_or_update_history_entry(
        &mut self,
        entry: HistoryEntry,
    ) -> Result<HistoryEntry, StorageError>;

    /// All entries, newest first.
    fn get_history(&self) -> Result<Vec<HistoryEntry>, StorageError>;

    fn delete_history(&mut self) -> Result<(), StorageError>;
}

/// Keeps history in memory only.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Vec<HistoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryStore {
    fn insert_or_update_history_entry(
        &mut self,
        entry: HistoryEntry,
    ) -> Result<HistoryEntry, StorageError> {
        Ok(upsert(&mut self.entries, entry))
    }

    fn get_history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        Ok(newest_first(self.entries.clone()))
    }

    fn delete_history(&mut self) -> Result<(), StorageError> {
        self.entries.clear();
        Ok(())
    }
}

/// Stores history as a JSON array in a single file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };

        serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl HistoryStore for JsonFileStore {
    fn insert_or_update_history_entry(
        &mut self,
        entry: HistoryEntry,
    ) -> Result<HistoryEntry, StorageError> {
        let mut entries = self.load()?;
        let stored = upsert(&mut entries, entry);
        self.save(&entries)?;
        debug!(id = ?stored.id, path = %self.path.display(), "Stored history entry");
        Ok(stored)
    }

    fn get_history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        Ok(newest_first(self.load()?))
    }

    fn delete_history(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }
}

fn upsert(entries: &mut Vec<HistoryEntry>, mut entry: HistoryEntry) -> HistoryEntry {
    match entry.id {
        Some(id) => {
            if let Some(existing) = entries.iter_mut().find(|e| e.id == Some(id)) {
                *existing = entry.clone();
                return entry;
            }
        }
        None => {
            let next_id = entries.iter().filter_map(|e| e.id).max().unwrap_or(0) + 1;
            entry.id = Some(next_id);
        }
    }

    entries.push(entry.clone());
    entry
}

fn newest_first(mut entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    // Ties keep insertion order reversed so the latest insert comes first.
    entries.reverse();
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(formula: &str, result: &str, timestamp: i64) -> HistoryEntry {
        HistoryEntry::new(formula.to_string(), result.to_string(), timestamp)
    }

    fn exercise(store: &mut dyn HistoryStore) {
        let first = store
            .insert_or_update_history_entry(entry("1+1", "2", 100))
            .unwrap();
        let second = store
            .insert_or_update_history_entry(entry("2×3", "6", 200))
            .unwrap();
        assert_eq!(first.id, Some(1));
        assert_eq!(second.id, Some(2));

        let history = store.get_history().unwrap();
        assert_eq!(history, vec![second.clone(), first.clone()]);

        let updated = HistoryEntry {
            result: "two".to_string(),
            ..first
        };
        store
            .insert_or_update_history_entry(updated.clone())
            .unwrap();
        let history = store.get_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], updated);

        store.delete_history().unwrap();
        assert!(store.get_history().unwrap().is_empty());
    }

    #[test]
    fn test_memory_store() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("history.json"));
        assert!(store.get_history().unwrap().is_empty());
        exercise(&mut store);
        store.delete_history().unwrap();
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut store = JsonFileStore::new(&path);
        store
            .insert_or_update_history_entry(entry("50%", "0.5", 1))
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        let history = reopened.get_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].formula, "50%");
        assert_eq!(history[0].id, Some(1));
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "garbage").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.get_history(),
            Err(StorageError::Json { .. })
        ));
    }

    #[test]
    fn test_same_timestamp_latest_first() {
        let mut store = MemoryStore::new();
        store
            .insert_or_update_history_entry(entry("1", "1", 5))
            .unwrap();
        store
            .insert_or_update_history_entry(entry("2", "2", 5))
            .unwrap();
        let history = store.get_history().unwrap();
        assert_eq!(history[0].formula, "2");
    }
}
