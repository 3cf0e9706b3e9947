// ABOUTME: Page API handlers: CRUD on a site's pages plus YAML export of the resolved tree.
// ABOUTME: Slug uniqueness is enforced by the store; status changes are written to the activity log.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use pagewright_core::export::export_yaml;
use pagewright_core::model::{PageSettings, is_valid_slug};
use pagewright_core::{Breakpoint, DocumentStore, Page, PageStatus, TreeResolver};
use pagewright_store::{ActivityEntry, delete_history};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::api::parse_id;
use crate::app_state::{SharedState, Site};
use crate::error::ApiError;
use crate::viewport::ViewQuery;

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub page_id: String,
    pub slug: String,
    pub title: String,
    pub status: PageStatus,
    pub updated_at: String,
}

impl From<&Page> for PageSummary {
    fn from(page: &Page) -> Self {
        Self {
            page_id: page.page_id.to_string(),
            slug: page.slug.clone(),
            title: page.title.clone(),
            status: page.status,
            updated_at: page.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePageRequest {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub section_ids: Vec<Ulid>,
    #[serde(default)]
    pub settings: PageSettings,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePageRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub status: Option<PageStatus>,
    pub section_ids: Option<Vec<Ulid>>,
    pub settings: Option<PageSettings>,
}

pub(crate) async fn load_page(site: &Site, page_id: Ulid) -> Result<Page, ApiError> {
    site.storage
        .store
        .get::<Page>(page_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("page".to_string()))
}

fn check_slug(slug: &str) -> Result<(), ApiError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid page slug: {}", slug)))
    }
}

/// GET /api/sites/{site}/pages - Pages sorted by slug.
pub async fn list_pages(
    State(state): State<SharedState>,
    Path(site): Path<String>,
) -> Result<Json<Vec<PageSummary>>, ApiError> {
    let site = state.site(&site).await?;
    let mut pages: Vec<Page> = site.storage.store.list().await?;
    pages.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(Json(pages.iter().map(PageSummary::from).collect()))
}

/// POST /api/sites/{site}/pages - Create a draft page.
pub async fn create_page(
    State(state): State<SharedState>,
    Path(site): Path<String>,
    Json(req): Json<CreatePageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_slug(&req.slug)?;
    let site = state.site(&site).await?;

    let mut page = Page::new(req.slug, req.title);
    page.section_ids = req.section_ids;
    page.settings = req.settings;
    site.storage.store.put(&page).await?;

    site.storage
        .record(ActivityEntry::new("page_created", Some(page.slug.clone())));
    tracing::info!(site = %site.slug(), page_id = %page.page_id, "page created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "page_id": page.page_id.to_string() })),
    ))
}

/// GET /api/sites/{site}/pages/{id}
pub async fn get_page(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
) -> Result<Json<Page>, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let site = state.site(&site).await?;
    Ok(Json(load_page(&site, page_id).await?))
}

/// PUT /api/sites/{site}/pages/{id} - Apply a partial update.
pub async fn update_page(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
    Json(req): Json<UpdatePageRequest>,
) -> Result<Json<Page>, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let site = state.site(&site).await?;
    let mut page = load_page(&site, page_id).await?;
    let previous_status = page.status;

    if let Some(slug) = req.slug {
        check_slug(&slug)?;
        page.slug = slug;
    }
    if let Some(title) = req.title {
        page.title = title;
    }
    if let Some(status) = req.status {
        page.status = status;
    }
    if let Some(section_ids) = req.section_ids {
        page.section_ids = section_ids;
    }
    if let Some(settings) = req.settings {
        page.settings = settings;
    }
    page.updated_at = Utc::now();
    site.storage.store.put(&page).await?;

    let action = match (previous_status, page.status) {
        (PageStatus::Draft, PageStatus::Published) => "page_published",
        (PageStatus::Published, PageStatus::Draft) => "page_unpublished",
        _ => "page_updated",
    };
    site.storage
        .record(ActivityEntry::new(action, Some(page.slug.clone())));

    Ok(Json(page))
}

/// DELETE /api/sites/{site}/pages/{id} - Remove the page, its editing
/// session, and its saved history. Sections it referenced are kept.
pub async fn delete_page(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let site = state.site(&site).await?;
    let page = load_page(&site, page_id).await?;

    site.close_session(page_id).await;
    site.storage.store.delete::<Page>(page_id).await?;
    delete_history(&site.storage.history_dir(), &page_id)?;

    site.storage
        .record(ActivityEntry::new("page_deleted", Some(page.slug)));
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/sites/{site}/pages/{id}/export?bp= - The resolved tree as YAML.
pub async fn export_page(
    State(state): State<SharedState>,
    Path((site, id)): Path<(String, String)>,
    Query(query): Query<ViewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page_id = parse_id(&id, "page")?;
    let breakpoint = match query.bp.as_deref() {
        Some(raw) => raw
            .parse::<Breakpoint>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => Breakpoint::default(),
    };

    let site = state.site(&site).await?;
    let page = load_page(&site, page_id).await?;
    let resolved = TreeResolver::new(&site.storage.store, breakpoint)
        .resolve_page(page)
        .await?;
    let yaml = export_yaml(&resolved)?;

    Ok(([(header::CONTENT_TYPE, "application/yaml")], yaml))
}
