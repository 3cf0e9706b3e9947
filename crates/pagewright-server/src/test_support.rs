// ABOUTME: Shared helpers for the server's unit tests: temp-dir state, seeded sites and pages, request builders.
// ABOUTME: Seeded pages are published "Home" pages with one section, one column, and a level-2 "Hello" heading.

use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use http::Request;
use http_body_util::BodyExt;
use pagewright_core::responsive::Width;
use pagewright_core::{
    Block, BlockType, Column, DocumentStore, LayoutMode, Page, PageStatus, Section, SiteSettings,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use ulid::Ulid;

use crate::app_state::{AppState, Site, SharedState};

pub fn test_state() -> (TempDir, SharedState) {
    let dir = TempDir::new().unwrap();
    let state = AppState::new(dir.path().to_path_buf(), 10).unwrap();
    (dir, Arc::new(state))
}

/// Create a site whose display name is its slug.
pub async fn create_site(state: &SharedState, slug: &str) -> Arc<Site> {
    state
        .create_site(slug, &SiteSettings::new(slug.to_string()))
        .await
        .unwrap()
}

pub struct SeededPage {
    pub page_id: Ulid,
    pub column_id: Ulid,
    pub block_id: Ulid,
}

pub async fn seed_page(site: &Site, slug: &str) -> SeededPage {
    let store = &site.storage.store;
    let block = Block::new(BlockType::Heading, json!({ "text": "Hello", "level": 2 }));
    let mut column = Column::new(Width::Percent(100.0));
    column.block_ids = vec![block.block_id];
    let mut section = Section::new(LayoutMode::Stacked);
    section.column_ids = vec![column.column_id];
    let mut page = Page::new(slug.to_string(), "Home".to_string());
    page.status = PageStatus::Published;
    page.section_ids = vec![section.section_id];

    store.put(&block).await.unwrap();
    store.put(&column).await.unwrap();
    store.put(&section).await.unwrap();
    store.put(&page).await.unwrap();
    SeededPage {
        page_id: page.page_id,
        column_id: column.column_id,
        block_id: block.block_id,
    }
}

/// A JSON request; `Value::Null` sends an empty body.
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    if body.is_null() {
        builder.body(Body::empty()).unwrap()
    } else {
        builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}

pub fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A browser GET, optionally carrying a viewport width client hint.
pub fn html_request(uri: &str, viewport_width: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri).header(http::header::ACCEPT, "text/html");
    if let Some(width) = viewport_width {
        builder = builder.header("sec-ch-viewport-width", width);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn read_text(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn read_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
