// ABOUTME: Upsert, fetch, and delete handlers for the tree's inner nodes: sections, columns, blocks.
// ABOUTME: Blocks are checked against their type's props shape before they are stored.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use pagewright_core::store::Collection;
use pagewright_core::{Block, BlockContent, Column, Document, DocumentStore, Section};
use pagewright_store::ActivityEntry;

use crate::api::parse_id;
use crate::app_state::SharedState;
use crate::error::ApiError;

fn kind_name<D: Document>() -> &'static str {
    match D::COLLECTION {
        Collection::Pages => "page",
        Collection::Sections => "section",
        Collection::Columns => "column",
        Collection::Blocks => "block",
    }
}

/// GET /api/sites/{site}/{sections|columns|blocks}/{id}
pub async fn get_node<D: Document>(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
) -> Result<Json<D>, ApiError> {
    let id = parse_id(&id, kind_name::<D>())?;
    let site = state.site(&site).await?;
    site.storage
        .store
        .get::<D>(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(kind_name::<D>().to_string()))
}

/// DELETE /api/sites/{site}/{sections|columns|blocks}/{id}. Parents that
/// still reference the node skip it when resolving.
pub async fn delete_node<D: Document>(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id, kind_name::<D>())?;
    let site = state.site(&site).await?;
    if site.storage.store.delete::<D>(id).await? {
        site.storage.record(ActivityEntry::new(
            format!("{}_deleted", kind_name::<D>()),
            Some(id.to_string()),
        ));
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(kind_name::<D>().to_string()))
    }
}

/// POST /api/sites/{site}/sections - Create or replace a section.
pub async fn put_section(
    State(state): State<SharedState>,
    Path(site): Path<String>,
    Json(section): Json<Section>,
) -> Result<Json<Section>, ApiError> {
    let site = state.site(&site).await?;
    site.storage.store.put(&section).await?;
    Ok(Json(section))
}

/// POST /api/sites/{site}/columns - Create or replace a column. A column
/// may not list itself as a child.
pub async fn put_column(
    State(state): State<SharedState>,
    Path(site): Path<String>,
    Json(column): Json<Column>,
) -> Result<Json<Column>, ApiError> {
    if column.column_ids.contains(&column.column_id) {
        return Err(ApiError::BadRequest(
            "a column cannot contain itself".to_string(),
        ));
    }
    let site = state.site(&site).await?;
    site.storage.store.put(&column).await?;
    Ok(Json(column))
}

/// POST /api/sites/{site}/blocks - Create or replace a block after
/// checking its props against its type.
pub async fn put_block(
    State(state): State<SharedState>,
    Path(site): Path<String>,
    Json(mut block): Json<Block>,
) -> Result<Json<Block>, ApiError> {
    BlockContent::from_block(&block)?;
    block.updated_at = Utc::now();

    let site = state.site(&site).await?;
    site.storage.store.put(&block).await?;
    Ok(Json(block))
}
