// ABOUTME: Builder-session handlers: open a page's editing session, submit commands, read and close it.
// ABOUTME: Saves write blocks and column membership to the store; a background task persists history snapshots.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use pagewright_core::{
    Block, BuilderCommand, BuilderHandle, DocumentStore, Page, SaveTarget, SessionState,
    SessionSummary, StoreError, collect_contents, spawn, write_contents,
};
use pagewright_store::{ActivityEntry, HistorySnapshot, load_history, save_history};
use serde_json::Value;
use ulid::Ulid;

use crate::api::pages::load_page;
use crate::api::parse_id;
use crate::app_state::{BuilderSession, SharedState, Site};
use crate::error::ApiError;

pub(crate) async fn session_handle(site: &Site, page_id: Ulid) -> Result<BuilderHandle, ApiError> {
    site.session(page_id)
        .await
        .ok_or_else(|| ApiError::NotFound("builder session".to_string()))
}

/// POST /api/sites/{site}/pages/{id}/builder - Open (or rejoin) the page's
/// editing session. A saved history is resumed; otherwise the session
/// starts from the page's stored blocks. Either way the session owns the
/// page's columns as they are now.
pub async fn open_session(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
) -> Result<Json<SessionSummary>, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let site = state.site(&site).await?;
    let page = load_page(&site, page_id).await?;

    let mut sessions = site.sessions.write().await;
    if let Some(existing) = sessions.get(&page_id) {
        return Ok(Json(existing.handle.read_state().await.summary()));
    }

    let history_dir = site.storage.history_dir();
    let contents = collect_contents(&site.storage.store, &page).await?;
    let columns = contents.column_ids();
    let initial = match load_history(&history_dir, &page_id)? {
        Some(snapshot) => {
            tracing::debug!(page_id = %page_id, "resuming saved builder history");
            snapshot.restore(state.history_capacity)?
        }
        None => SessionState::new(page_id, contents.blocks, state.history_capacity),
    };

    let saver = PageSaver {
        site: Arc::downgrade(&site),
    };
    let handle = spawn(initial.with_columns(columns), Arc::new(saver));
    let persister = spawn_history_persister(&handle, history_dir);
    let summary = handle.read_state().await.summary();
    sessions.insert(page_id, BuilderSession { handle, persister });

    site.storage
        .record(ActivityEntry::new("builder_opened", Some(page.slug)));
    Ok(Json(summary))
}

/// POST /api/sites/{site}/pages/{id}/builder/commands - Apply a command and
/// return the events it produced alongside the new session state.
pub async fn submit_command(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
    Json(cmd): Json<BuilderCommand>,
) -> Result<Json<Value>, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let site = state.site(&site).await?;
    let handle = session_handle(&site, page_id).await?;
    let events = handle.send_command(cmd).await?;
    let summary = handle.read_state().await.summary();
    Ok(Json(serde_json::json!({
        "events": events,
        "state": summary,
    })))
}

/// GET /api/sites/{site}/pages/{id}/builder/state
pub async fn get_session_state(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
) -> Result<Json<SessionSummary>, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let site = state.site(&site).await?;
    let handle = session_handle(&site, page_id).await?;
    let summary = handle.read_state().await.summary();
    Ok(Json(summary))
}

/// DELETE /api/sites/{site}/pages/{id}/builder - Write a final history
/// snapshot and close the session. Unsaved blocks stay in the history.
pub async fn close_session(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let site = state.site(&site).await?;
    let handle = site
        .close_session(page_id)
        .await
        .ok_or_else(|| ApiError::NotFound("builder session".to_string()))?;

    let snapshot = HistorySnapshot::capture(&*handle.read_state().await);
    save_history(&site.storage.history_dir(), &snapshot)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Writes a session's saves into its site's store.
struct PageSaver {
    site: Weak<Site>,
}

#[async_trait]
impl SaveTarget for PageSaver {
    async fn save(&self, page_id: Ulid, columns: &[Ulid], blocks: &[Block]) -> Result<(), StoreError> {
        let site = self
            .site
            .upgrade()
            .ok_or_else(|| StoreError::Backend("site is no longer open".into()))?;
        let store = &site.storage.store;
        let written = write_contents(store, columns, blocks).await?;

        let mut slug = None;
        if let Some(mut page) = store.get::<Page>(page_id).await? {
            page.updated_at = Utc::now();
            store.put(&page).await?;
            slug = Some(page.slug);
        }

        tracing::info!(
            page_id = %page_id,
            blocks = written.blocks_written,
            unlinked = written.blocks_unlinked,
            "page saved"
        );
        site.storage.record(
            ActivityEntry::new("page_saved", slug)
                .with_detail(format!("{} blocks", written.blocks_written)),
        );
        Ok(())
    }
}

/// Spawn a task that writes a history snapshot after every event the
/// session broadcasts, so the undo/redo stack survives a restart.
fn spawn_history_persister(handle: &BuilderHandle, dir: PathBuf) -> tokio::task::JoinHandle<()> {
    let mut rx = handle.subscribe();
    let handle = handle.clone();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        page_id = %handle.page_id,
                        "history persister lagged, missed {} events",
                        n
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }

            let snapshot = HistorySnapshot::capture(&*handle.read_state().await);
            if let Err(e) = save_history(&dir, &snapshot) {
                tracing::error!(
                    page_id = %handle.page_id,
                    "failed to save builder history: {}",
                    e
                );
            }
        }
    })
}
