// ABOUTME: Defines the BuilderCommand enum: every edit an editor can apply to a builder session.
// ABOUTME: Commands are validated against the session's current snapshot and turned into events.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::Block;
use crate::responsive::{LayoutSettings, ResponsiveOverrides};

/// A requested change to an editing session. Commands are validated by the
/// builder actor and translated into zero or more events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuilderCommand {
    /// Replace the whole block array with a new snapshot.
    Set { blocks: Vec<Block> },
    /// Patch a single block in the current snapshot, recording the result
    /// as a new snapshot.
    UpdateBlock {
        block_id: Ulid,
        #[serde(default)]
        props: Option<serde_json::Value>,
        #[serde(default)]
        layout: Option<LayoutSettings>,
        #[serde(default)]
        responsive: Option<ResponsiveOverrides>,
    },
    Undo,
    Redo,
    /// Discard all history and start again from `blocks`.
    Reset { blocks: Vec<Block> },
    /// Persist the current snapshot.
    Save,
}
