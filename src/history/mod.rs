//! Calculation history.
//!
//! Entries are created by the formula editor on every successful evaluation
//! and handed to a [`HistorySink`]. Storage backends implement
//! [`HistoryStore`].

mod store;
mod writer;

pub use store::{HistoryStore, JsonFileStore, MemoryStore, StorageError};
pub use writer::{HistoryHandle, HistoryWriter};

use serde::{Deserialize, Serialize};

/// A past calculation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Assigned by the store on first insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub formula: String,
    pub result: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn new(formula: String, result: String, timestamp: i64) -> Self {
        Self {
            id: None,
            formula,
            result,
            timestamp,
        }
    }
}

/// Receives history entries without blocking the caller.
pub trait HistorySink: Send {
    fn record(&self, entry: HistoryEntry);
}
