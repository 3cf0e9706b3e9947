// ABOUTME: Defines the builder event envelope and payload variants broadcast by a session actor.
// ABOUTME: Events are facts about how a page's editing history changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::Block;

/// An event envelope wrapping a timestamped, sequenced payload for one page's
/// editing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderEvent {
    pub seq: u64,
    pub page_id: Ulid,
    pub timestamp: DateTime<Utc>,
    pub payload: BuilderEventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuilderEventPayload {
    HistoryPushed { blocks: Vec<Block> },
    Undone,
    Redone,
    HistoryReset { blocks: Vec<Block> },
    Saved { blocks: Vec<Block> },
}

impl BuilderEventPayload {
    /// Snake-case name used as the SSE event type.
    pub fn name(&self) -> &'static str {
        match self {
            BuilderEventPayload::HistoryPushed { .. } => "history_pushed",
            BuilderEventPayload::Undone => "undone",
            BuilderEventPayload::Redone => "redone",
            BuilderEventPayload::HistoryReset { .. } => "history_reset",
            BuilderEventPayload::Saved { .. } => "saved",
        }
    }
}
