// ABOUTME: Async actor owning one page's editing session, driven by tokio channels.
// ABOUTME: Provides BuilderHandle for sending commands, subscribing to events, and reading state.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use ulid::Ulid;

use crate::command::BuilderCommand;
use crate::content::{BlockContent, ContentError};
use crate::event::{BuilderEvent, BuilderEventPayload};
use crate::model::Block;
use crate::session::SessionState;
use crate::store::StoreError;

/// Errors that can occur when processing builder commands.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("block not found in current snapshot: {0}")]
    BlockNotFound(Ulid),

    #[error("block appears more than once in snapshot: {0}")]
    DuplicateBlock(Ulid),

    #[error("block {block_id} cannot be saved: {source}")]
    InvalidBlock {
        block_id: Ulid,
        #[source]
        source: ContentError,
    },

    #[error("block is not placed in a column of this page: {0}")]
    UnplacedBlock(Ulid),

    #[error("saving session failed: {0}")]
    SaveFailed(#[source] StoreError),

    #[error("builder channel closed")]
    ChannelClosed,
}

/// Where a session's blocks go when it is saved. The actor awaits this before
/// emitting `Saved`, so a failed write leaves the session dirty.
#[async_trait]
pub trait SaveTarget: Send + Sync {
    async fn save(&self, page_id: Ulid, columns: &[Ulid], blocks: &[Block]) -> Result<(), StoreError>;
}

/// Message type sent through the command channel: a command paired with
/// a oneshot sender for the response.
type CommandMessage = (
    BuilderCommand,
    oneshot::Sender<Result<Vec<BuilderEvent>, ActorError>>,
);

/// Public handle for interacting with a builder session actor.
#[derive(Clone)]
pub struct BuilderHandle {
    cmd_tx: mpsc::Sender<CommandMessage>,
    event_tx: broadcast::Sender<BuilderEvent>,
    state: Arc<RwLock<SessionState>>,
    pub page_id: Ulid,
}

impl BuilderHandle {
    /// Send a command to the actor and await the resulting events. A command
    /// that changes nothing (undo at the oldest entry, say) yields no events.
    pub async fn send_command(&self, cmd: BuilderCommand) -> Result<Vec<BuilderEvent>, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send((cmd, tx))
            .await
            .map_err(|_| ActorError::ChannelClosed)?;
        rx.await.map_err(|_| ActorError::ChannelClosed)?
    }

    /// Subscribe to the event broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<BuilderEvent> {
        self.event_tx.subscribe()
    }

    /// Get a read-only reference to the shared state.
    pub async fn read_state(&self) -> tokio::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().await
    }
}

/// Spawn a builder actor task for `initial` and return its handle. Commands
/// are processed sequentially; each is converted to events, applied to the
/// session, and broadcast to subscribers. Saves are written through `target`.
pub fn spawn(initial: SessionState, target: Arc<dyn SaveTarget>) -> BuilderHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<CommandMessage>(64);
    let (event_tx, _) = broadcast::channel::<BuilderEvent>(256);
    let page_id = initial.page_id;
    let next_seq = initial.last_seq + 1;
    let state = Arc::new(RwLock::new(initial));

    let handle = BuilderHandle {
        cmd_tx,
        event_tx: event_tx.clone(),
        state: Arc::clone(&state),
        page_id,
    };

    let actor = BuilderActor {
        state,
        cmd_rx,
        event_tx,
        target,
        next_seq,
        page_id,
    };

    tokio::spawn(actor.run());

    handle
}

struct BuilderActor {
    state: Arc<RwLock<SessionState>>,
    cmd_rx: mpsc::Receiver<CommandMessage>,
    event_tx: broadcast::Sender<BuilderEvent>,
    target: Arc<dyn SaveTarget>,
    next_seq: u64,
    page_id: Ulid,
}

impl BuilderActor {
    async fn run(mut self) {
        while let Some((cmd, reply_tx)) = self.cmd_rx.recv().await {
            let result = self.process_command(cmd).await;
            // The caller may have dropped their receiver
            let _ = reply_tx.send(result);
        }
        tracing::debug!(page_id = %self.page_id, "builder session closed");
    }

    async fn process_command(&mut self, cmd: BuilderCommand) -> Result<Vec<BuilderEvent>, ActorError> {
        let events = self.command_to_events(cmd).await?;

        {
            let mut state = self.state.write().await;
            for event in &events {
                state.apply(event);
            }
        }

        for event in &events {
            // No active subscribers is fine
            let _ = self.event_tx.send(event.clone());
        }

        Ok(events)
    }

    /// Validate a command against the current snapshot and convert it into
    /// event payloads.
    async fn command_to_events(&mut self, cmd: BuilderCommand) -> Result<Vec<BuilderEvent>, ActorError> {
        let state = self.state.read().await;

        let payloads = match cmd {
            BuilderCommand::Set { blocks } => {
                check_unique(&blocks)?;
                vec![BuilderEventPayload::HistoryPushed { blocks }]
            }

            BuilderCommand::UpdateBlock {
                block_id,
                props,
                layout,
                responsive,
            } => {
                let mut blocks = state.blocks().to_vec();
                let block = blocks
                    .iter_mut()
                    .find(|b| b.block_id == block_id)
                    .ok_or(ActorError::BlockNotFound(block_id))?;
                if let Some(props) = props {
                    block.props = props;
                }
                if let Some(layout) = layout {
                    block.layout = layout;
                }
                if let Some(responsive) = responsive {
                    block.responsive = responsive;
                }
                block.updated_at = Utc::now();
                vec![BuilderEventPayload::HistoryPushed { blocks }]
            }

            BuilderCommand::Undo => {
                if state.history.can_undo() {
                    vec![BuilderEventPayload::Undone]
                } else {
                    Vec::new()
                }
            }

            BuilderCommand::Redo => {
                if state.history.can_redo() {
                    vec![BuilderEventPayload::Redone]
                } else {
                    Vec::new()
                }
            }

            BuilderCommand::Reset { blocks } => {
                check_unique(&blocks)?;
                vec![BuilderEventPayload::HistoryReset { blocks }]
            }

            BuilderCommand::Save => {
                let blocks = state.blocks().to_vec();
                let columns = state.columns.clone();
                drop(state);
                check_saveable(&columns, &blocks)?;
                self.target
                    .save(self.page_id, &columns, &blocks)
                    .await
                    .map_err(ActorError::SaveFailed)?;
                return Ok(self.stamp(vec![BuilderEventPayload::Saved { blocks }]));
            }
        };

        drop(state);
        Ok(self.stamp(payloads))
    }

    fn stamp(&mut self, payloads: Vec<BuilderEventPayload>) -> Vec<BuilderEvent> {
        let now = Utc::now();
        payloads
            .into_iter()
            .map(|payload| {
                let seq = self.next_seq;
                self.next_seq += 1;
                BuilderEvent {
                    seq,
                    page_id: self.page_id,
                    timestamp: now,
                    payload,
                }
            })
            .collect()
    }
}

fn check_unique(blocks: &[Block]) -> Result<(), ActorError> {
    let mut seen = HashSet::new();
    for block in blocks {
        if !seen.insert(block.block_id) {
            return Err(ActorError::DuplicateBlock(block.block_id));
        }
    }
    Ok(())
}

/// Every block must hold valid properties and sit in a column the session
/// owns before it may be persisted.
fn check_saveable(columns: &[Ulid], blocks: &[Block]) -> Result<(), ActorError> {
    for block in blocks {
        BlockContent::from_block(block).map_err(|source| ActorError::InvalidBlock {
            block_id: block.block_id,
            source,
        })?;
        match block.column_id {
            Some(column_id) if columns.contains(&column_id) => {}
            _ => return Err(ActorError::UnplacedBlock(block.block_id)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockType;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every save it is asked for.
    #[derive(Default)]
    struct RecordingTarget {
        saves: Mutex<Vec<Vec<Block>>>,
    }

    #[async_trait]
    impl SaveTarget for RecordingTarget {
        async fn save(&self, _page_id: Ulid, _columns: &[Ulid], blocks: &[Block]) -> Result<(), StoreError> {
            self.saves.lock().unwrap().push(blocks.to_vec());
            Ok(())
        }
    }

    struct FailingTarget;

    #[async_trait]
    impl SaveTarget for FailingTarget {
        async fn save(&self, _page_id: Ulid, _columns: &[Ulid], _blocks: &[Block]) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".into()))
        }
    }

    fn column() -> Ulid {
        Ulid::from_string("01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap()
    }

    fn heading(text: &str) -> Block {
        Block::new(BlockType::Heading, json!({ "text": text })).in_column(column())
    }

    fn session(blocks: Vec<Block>, capacity: usize) -> SessionState {
        SessionState::new(Ulid::new(), blocks, capacity).with_columns(vec![column()])
    }

    fn new_session(blocks: Vec<Block>) -> BuilderHandle {
        spawn(session(blocks, 10), Arc::new(RecordingTarget::default()))
    }

    #[tokio::test]
    async fn set_pushes_history_and_undo_redo_walk_it() {
        let handle = new_session(vec![]);

        let events = handle
            .send_command(BuilderCommand::Set {
                blocks: vec![heading("Hello")],
            })
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].seq, 1);

        handle.send_command(BuilderCommand::Undo).await.unwrap();
        assert!(handle.read_state().await.blocks().is_empty());

        handle.send_command(BuilderCommand::Redo).await.unwrap();
        let state = handle.read_state().await;
        assert_eq!(state.blocks().len(), 1);
        assert_eq!(state.blocks()[0].props["text"], "Hello");
    }

    #[tokio::test]
    async fn undo_at_oldest_entry_is_a_no_op() {
        let handle = new_session(vec![heading("Only")]);
        let events = handle.send_command(BuilderCommand::Undo).await.unwrap();
        assert!(events.is_empty());
        let events = handle.send_command(BuilderCommand::Redo).await.unwrap();
        assert!(events.is_empty());

        let state = handle.read_state().await;
        assert_eq!(state.history.len(), 1);
        assert!(!state.is_dirty());
    }

    #[tokio::test]
    async fn update_block_patches_a_copy_of_current_snapshot() {
        let block = heading("Before");
        let block_id = block.block_id;
        let handle = new_session(vec![block]);

        handle
            .send_command(BuilderCommand::UpdateBlock {
                block_id,
                props: Some(json!({ "text": "After", "level": 1 })),
                layout: None,
                responsive: None,
            })
            .await
            .unwrap();

        let state = handle.read_state().await;
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.blocks()[0].props["text"], "After");
        let first = state.history.entries().next().unwrap();
        assert_eq!(first[0].props["text"], "Before");
    }

    #[tokio::test]
    async fn update_unknown_block_is_rejected() {
        let handle = new_session(vec![heading("x")]);
        let missing = Ulid::new();
        let err = handle
            .send_command(BuilderCommand::UpdateBlock {
                block_id: missing,
                props: None,
                layout: None,
                responsive: None,
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, ActorError::BlockNotFound(id) if id == missing),
            "expected BlockNotFound, got: {}",
            err
        );
    }

    #[tokio::test]
    async fn duplicate_block_ids_are_rejected() {
        let handle = new_session(vec![]);
        let block = heading("twice");
        let err = handle
            .send_command(BuilderCommand::Set {
                blocks: vec![block.clone(), block],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ActorError::DuplicateBlock(_)));
    }

    #[tokio::test]
    async fn save_broadcasts_current_blocks_and_clears_dirty() {
        let target = Arc::new(RecordingTarget::default());
        let handle = spawn(session(vec![], 10), target.clone());
        let mut rx = handle.subscribe();

        handle
            .send_command(BuilderCommand::Set {
                blocks: vec![heading("Saved")],
            })
            .await
            .unwrap();
        assert!(handle.read_state().await.is_dirty());

        handle.send_command(BuilderCommand::Save).await.unwrap();
        assert_eq!(target.saves.lock().unwrap().len(), 1);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.payload.name(), "history_pushed");
        let second = rx.recv().await.unwrap();
        match &second.payload {
            BuilderEventPayload::Saved { blocks } => assert_eq!(blocks.len(), 1),
            other => panic!("expected Saved, got {:?}", other),
        }
        assert_eq!(second.seq, 2);
        assert!(!handle.read_state().await.is_dirty());
    }

    #[tokio::test]
    async fn failed_save_emits_nothing_and_stays_dirty() {
        let handle = spawn(session(vec![], 10), Arc::new(FailingTarget));
        handle
            .send_command(BuilderCommand::Set {
                blocks: vec![heading("Unsaved")],
            })
            .await
            .unwrap();
        let mut rx = handle.subscribe();

        let err = handle.send_command(BuilderCommand::Save).await.unwrap_err();
        assert!(matches!(err, ActorError::SaveFailed(_)), "got: {}", err);
        assert!(handle.read_state().await.is_dirty());
        assert!(rx.try_recv().is_err());

        // The sequence number was not spent
        let events = handle
            .send_command(BuilderCommand::Set { blocks: vec![] })
            .await
            .unwrap();
        assert_eq!(events[0].seq, 2);
    }

    #[tokio::test]
    async fn invalid_props_are_refused_before_writing() {
        let target = Arc::new(RecordingTarget::default());
        let handle = spawn(session(vec![], 10), target.clone());
        let bad = Block::new(BlockType::Heading, json!({ "text": "x", "level": 9 })).in_column(column());
        handle
            .send_command(BuilderCommand::Set { blocks: vec![bad] })
            .await
            .unwrap();

        let err = handle.send_command(BuilderCommand::Save).await.unwrap_err();
        assert!(matches!(err, ActorError::InvalidBlock { .. }), "got: {}", err);
        assert!(target.saves.lock().unwrap().is_empty());
        assert!(handle.read_state().await.is_dirty());
    }

    #[tokio::test]
    async fn blocks_outside_owned_columns_are_refused() {
        let target = Arc::new(RecordingTarget::default());
        let handle = spawn(session(vec![], 10), target.clone());
        let stray = Block::new(BlockType::Heading, json!({ "text": "stray" }));
        let stray_id = stray.block_id;
        handle
            .send_command(BuilderCommand::Set { blocks: vec![stray] })
            .await
            .unwrap();

        let err = handle.send_command(BuilderCommand::Save).await.unwrap_err();
        assert!(matches!(err, ActorError::UnplacedBlock(id) if id == stray_id));
        assert!(target.saves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sequence_continues_from_restored_state() {
        let mut restored = session(vec![], 10);
        restored.last_seq = 41;
        let handle = spawn(restored, Arc::new(RecordingTarget::default()));

        let events = handle.send_command(BuilderCommand::Save).await.unwrap();
        assert_eq!(events[0].seq, 42);
    }

    #[tokio::test]
    async fn capacity_bounds_session_history() {
        let handle = spawn(session(vec![], 3), Arc::new(RecordingTarget::default()));
        for i in 0..5 {
            handle
                .send_command(BuilderCommand::Set {
                    blocks: vec![heading(&format!("v{}", i))],
                })
                .await
                .unwrap();
        }
        let state = handle.read_state().await;
        assert_eq!(state.history.len(), 3);
        assert_eq!(state.history.index(), 2);
        assert_eq!(state.blocks()[0].props["text"], "v4");
    }
}
