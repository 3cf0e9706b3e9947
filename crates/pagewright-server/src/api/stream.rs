// ABOUTME: SSE handler streaming a builder session's events to connected editors.
// ABOUTME: Subscribes to the session's broadcast channel and names each SSE event after its payload.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use pagewright_core::BuilderEvent;
use tokio_stream::wrappers::BroadcastStream;

use crate::api::builder::session_handle;
use crate::api::parse_id;
use crate::app_state::SharedState;
use crate::error::ApiError;

/// Convert a broadcast receiver into an SSE-compatible stream. Events missed
/// by a lagging receiver are dropped; clients resync from the state endpoint.
fn event_stream_from_receiver(
    rx: tokio::sync::broadcast::Receiver<BuilderEvent>,
) -> impl Stream<Item = Result<SseEvent, axum::Error>> {
    BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(SseEvent::default()
                    .event(event.payload.name())
                    .id(event.seq.to_string())
                    .data(data)))
            }
            Err(_) => None,
        }
    })
}

/// GET /api/sites/{site}/pages/{id}/builder/stream
pub async fn builder_stream(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let site = state.site(&site).await?;
    let handle = session_handle(&site, page_id).await?;

    let stream = event_stream_from_receiver(handle.subscribe());
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagewright_core::{
        Block, BlockType, BuilderCommand, SaveTarget, SessionState, StoreError, spawn,
    };
    use std::sync::Arc;
    use ulid::Ulid;

    struct DiscardSaves;

    #[async_trait]
    impl SaveTarget for DiscardSaves {
        async fn save(&self, _page_id: Ulid, _columns: &[Ulid], _blocks: &[Block]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn stream_yields_one_item_per_event() {
        let block = Block::new(BlockType::Divider, serde_json::json!({}));
        let handle = spawn(
            SessionState::new(Ulid::new(), vec![block.clone()], 10),
            Arc::new(DiscardSaves),
        );
        let mut stream = Box::pin(event_stream_from_receiver(handle.subscribe()));

        handle
            .send_command(BuilderCommand::Set {
                blocks: vec![block.clone(), Block::new(BlockType::Spacer, serde_json::json!({}))],
            })
            .await
            .unwrap();
        handle.send_command(BuilderCommand::Undo).await.unwrap();

        for _ in 0..2 {
            let item = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
                .await
                .expect("should receive event within timeout")
                .expect("stream should have an item");
            assert!(item.is_ok());
        }
    }

    #[tokio::test]
    async fn stream_without_session_is_not_found() {
        use crate::routes::create_router;
        use crate::test_support::{create_site, json_request, seed_page, test_state};
        use tower::ServiceExt;

        let (_dir, state) = test_state();
        let site = create_site(&state, "acme").await;
        let seeded = seed_page(&site, "home").await;
        let app = create_router(state);

        let resp = app
            .oneshot(json_request(
                "GET",
                &format!("/api/sites/acme/pages/{}/builder/stream", seeded.page_id),
                serde_json::Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }
}
