// ABOUTME: Defines SessionState, the materialized state of one page's editing session.
// ABOUTME: apply() folds builder events into the history buffer and the saved position.

use serde::Serialize;
use ulid::Ulid;

use crate::event::{BuilderEvent, BuilderEventPayload};
use crate::history::HistoryBuffer;
use crate::model::Block;

/// Editing state for a single page: a bounded history of block-array
/// snapshots, the columns whose membership the session owns, and which
/// history entry was last persisted.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub page_id: Ulid,
    pub history: HistoryBuffer<Vec<Block>>,
    pub columns: Vec<Ulid>,
    /// History index matching what is in the store. None once that entry was
    /// truncated, evicted, or replaced by a reset.
    pub saved_index: Option<usize>,
    pub last_seq: u64,
}

/// Read-only view of a session for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub page_id: Ulid,
    pub index: usize,
    pub len: usize,
    pub capacity: usize,
    pub can_undo: bool,
    pub can_redo: bool,
    pub dirty: bool,
    pub blocks: Vec<Block>,
}

impl SessionState {
    /// Start a session whose only history entry is `blocks`, taken to match
    /// the store.
    pub fn new(page_id: Ulid, blocks: Vec<Block>, capacity: usize) -> Self {
        Self::from_history(page_id, HistoryBuffer::new(blocks, capacity), Some(0))
    }

    /// Resume a session from a restored history.
    pub fn from_history(
        page_id: Ulid,
        history: HistoryBuffer<Vec<Block>>,
        saved_index: Option<usize>,
    ) -> Self {
        Self {
            page_id,
            history,
            columns: Vec::new(),
            saved_index,
            last_seq: 0,
        }
    }

    /// Set the columns whose block membership this session owns.
    pub fn with_columns(mut self, columns: Vec<Ulid>) -> Self {
        self.columns = columns;
        self
    }

    /// Whether the current entry differs from what was last persisted.
    pub fn is_dirty(&self) -> bool {
        self.saved_index != Some(self.history.index())
    }

    /// The block array at the current history position.
    pub fn blocks(&self) -> &[Block] {
        self.history.current()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            page_id: self.page_id,
            index: self.history.index(),
            len: self.history.len(),
            capacity: self.history.capacity(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            dirty: self.is_dirty(),
            blocks: self.history.current().clone(),
        }
    }

    /// Apply a single event to this session.
    pub fn apply(&mut self, event: &BuilderEvent) {
        self.last_seq = event.seq;

        match &event.payload {
            BuilderEventPayload::HistoryPushed { blocks } => {
                let kept = self.history.index() + 1;
                let evicts = kept == self.history.capacity();
                self.history.set(blocks.clone());
                self.saved_index = self
                    .saved_index
                    .filter(|saved| *saved < kept)
                    .and_then(|saved| if evicts { saved.checked_sub(1) } else { Some(saved) });
            }
            BuilderEventPayload::Undone => {
                self.history.undo();
            }
            BuilderEventPayload::Redone => {
                self.history.redo();
            }
            BuilderEventPayload::HistoryReset { blocks } => {
                self.history.reset(blocks.clone());
                self.saved_index = None;
            }
            BuilderEventPayload::Saved { .. } => {
                self.saved_index = Some(self.history.index());
            }
        }
    }
}
