//! Background history writer.
//!
//! Entries are queued on a channel and written by a single thread, so writes
//! happen in the order evaluations occurred and never block the editor.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::{HistoryEntry, HistorySink, HistoryStore};

enum Command {
    Record(HistoryEntry),
    Shutdown,
}

/// Cloneable handle that queues entries for a [`HistoryWriter`].
#[derive(Clone)]
pub struct HistoryHandle {
    sender: flume::Sender<Command>,
}

impl HistorySink for HistoryHandle {
    fn record(&self, entry: HistoryEntry) {
        if self.sender.send(Command::Record(entry)).is_err() {
            warn!("History writer has stopped; dropping entry");
        }
    }
}

/// Owns a [`HistoryStore`] on a dedicated thread.
pub struct HistoryWriter {
    sender: flume::Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl HistoryWriter {
    /// Start the writer thread.
    ///
    /// A failed write is retried up to `max_retries` times before the entry
    /// is dropped.
    pub fn spawn<S>(store: S, max_retries: u32) -> std::io::Result<Self>
    where
        S: HistoryStore + 'static,
    {
        let (sender, receiver) = flume::unbounded();
        let thread = thread::Builder::new()
            .name("history-writer".to_string())
            .spawn(move || run(store, receiver, max_retries))?;

        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> HistoryHandle {
        HistoryHandle {
            sender: self.sender.clone(),
        }
    }

    /// Write everything queued so far, then stop the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // The thread may already be gone if the store panicked.
        let _ = self.sender.send(Command::Shutdown);
        if thread.join().is_err() {
            warn!("History writer thread panicked");
        }
    }
}

impl Drop for HistoryWriter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<S: HistoryStore>(mut store: S, receiver: flume::Receiver<Command>, max_retries: u32) {
    for command in receiver.iter() {
        match command {
            Command::Record(entry) => write_with_retry(&mut store, entry, max_retries),
            Command::Shutdown => break,
        }
    }
    debug!("History writer stopped");
}

fn write_with_retry<S: HistoryStore>(store: &mut S, entry: HistoryEntry, max_retries: u32) {
    let mut attempt = 0;
    loop {
        match store.insert_or_update_history_entry(entry.clone()) {
            Ok(stored) => {
                debug!(id = ?stored.id, "History entry written");
                return;
            }
            Err(err) if attempt < max_retries => {
                attempt += 1;
                warn!(attempt, error = %err, "Failed to write history entry, retrying");
                thread::sleep(Duration::from_millis(10 * u64::from(attempt)));
            }
            Err(err) => {
                warn!(error = %err, formula = %entry.formula, "Giving up on history entry");
                return;
            }
        }
    }
}
