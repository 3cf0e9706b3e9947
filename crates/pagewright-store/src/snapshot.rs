// ABOUTME: Atomic save and load of builder-session history, one JSON file per page.
// ABOUTME: Lets an editing session resume its undo/redo stack after a restart.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pagewright_core::history::{HistoryBuffer, HistoryError};
use pagewright_core::model::Block;
use pagewright_core::session::SessionState;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid history: {0}")]
    History(#[from] HistoryError),
}

/// The persisted form of a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub page_id: Ulid,
    pub index: usize,
    pub capacity: usize,
    pub last_seq: u64,
    pub entries: Vec<Vec<Block>>,
    /// Entry that matches the store. Absent in older files, which then
    /// restore as dirty.
    #[serde(default)]
    pub saved_index: Option<usize>,
    pub saved_at: DateTime<Utc>,
}

impl HistorySnapshot {
    pub fn capture(session: &SessionState) -> Self {
        Self {
            page_id: session.page_id,
            index: session.history.index(),
            capacity: session.history.capacity(),
            last_seq: session.last_seq,
            entries: session.history.entries().cloned().collect(),
            saved_index: session.saved_index,
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a session, re-capping the history to `capacity` (which may
    /// differ from the capacity it was saved with). The session owns no
    /// columns until the caller supplies the page's current ones.
    pub fn restore(self, capacity: usize) -> Result<SessionState, SnapshotError> {
        let stored = self.entries.len();
        let history = HistoryBuffer::from_parts(self.entries, self.index, capacity)?;
        let dropped = stored - history.len();
        let saved_index = self.saved_index.and_then(|i| i.checked_sub(dropped));
        let mut session = SessionState::from_history(self.page_id, history, saved_index);
        session.last_seq = self.last_seq;
        Ok(session)
    }
}

fn snapshot_path(dir: &Path, page_id: &Ulid) -> PathBuf {
    dir.join(format!("page_{}.json", page_id))
}

/// Save a snapshot using atomic write (write to .tmp, fsync, rename).
/// Creates the target directory if it does not exist.
pub fn save_history(dir: &Path, snapshot: &HistorySnapshot) -> Result<(), SnapshotError> {
    fs::create_dir_all(dir)?;

    let final_path = snapshot_path(dir, &snapshot.page_id);
    let tmp_path = final_path.with_extension("tmp");

    let json = serde_json::to_string(snapshot)?;

    let mut file = File::create(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, &final_path)?;

    Ok(())
}

/// Load the saved history for a page, if any.
pub fn load_history(dir: &Path, page_id: &Ulid) -> Result<Option<HistorySnapshot>, SnapshotError> {
    let path = snapshot_path(dir, page_id);
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Remove a page's saved history. Missing files are not an error.
pub fn delete_history(dir: &Path, page_id: &Ulid) -> Result<(), SnapshotError> {
    match fs::remove_file(snapshot_path(dir, page_id)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
