// ABOUTME: Admin dashboard views: site overview, a site's pages and recent activity, full logs, and previews.
// ABOUTME: Previews render drafts too, and show an open editing session's current blocks.

use askama::Template;
use askama_derive_axum::IntoResponse as AskamaIntoResponse;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use pagewright_core::store::Collection;
use pagewright_core::{DocumentStore, Page, PageStatus, StoreError, TreeResolver};
use pagewright_store::ActivityEntry;
use serde::Deserialize;

use crate::api::pages::load_page;
use crate::api::parse_id;
use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::viewport::{ViewQuery, breakpoint_for};
use crate::web::{PageTemplate, PreviewBanner, html_error};

const RECENT_ACTIVITY: usize = 10;
const DEFAULT_LOG_LIMIT: usize = 200;

pub struct SiteRow {
    pub slug: String,
    pub name: String,
    pub page_count: u64,
}

pub struct PageRow {
    pub page_id: String,
    pub slug: String,
    pub title: String,
    pub published: bool,
    pub editing: bool,
    pub updated_at: String,
}

pub struct ActivityRow {
    pub timestamp: String,
    pub action: String,
    pub target: String,
    pub detail: String,
}

impl From<ActivityEntry> for ActivityRow {
    fn from(entry: ActivityEntry) -> Self {
        Self {
            timestamp: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            action: entry.action,
            target: entry.target.unwrap_or_default(),
            detail: entry.detail.unwrap_or_default(),
        }
    }
}

#[derive(Template, AskamaIntoResponse)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub sites: Vec<SiteRow>,
}

#[derive(Template, AskamaIntoResponse)]
#[template(path = "admin/site.html")]
pub struct AdminSiteTemplate {
    pub slug: String,
    pub name: String,
    pub tagline: String,
    pub public_url: String,
    pub pages: Vec<PageRow>,
    pub activity: Vec<ActivityRow>,
}

#[derive(Template, AskamaIntoResponse)]
#[template(path = "admin/logs.html")]
pub struct AdminLogsTemplate {
    pub slug: String,
    pub limit: usize,
    pub activity: Vec<ActivityRow>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

fn render<T: IntoResponse>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(page) => page.into_response(),
        Err(e) => html_error(e),
    }
}

/// GET /admin - Every site with its page count.
pub async fn dashboard(State(state): State<SharedState>) -> Response {
    render(load_dashboard(&state).await)
}

async fn load_dashboard(state: &SharedState) -> Result<AdminIndexTemplate, ApiError> {
    state.load_sites().await?;
    let mut sites = Vec::new();
    for slug in state.site_slugs().await {
        let site = state.site(&slug).await?;
        let settings = site.settings().await?;
        let page_count = site
            .storage
            .store
            .count(Collection::Pages)
            .map_err(StoreError::from)?;
        sites.push(SiteRow {
            slug,
            name: settings.name,
            page_count,
        });
    }
    Ok(AdminIndexTemplate { sites })
}

/// GET /admin/sites/{site} - Pages and the latest activity.
pub async fn site_overview(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Response {
    render(load_site_overview(&state, slug).await)
}

async fn load_site_overview(
    state: &SharedState,
    slug: String,
) -> Result<AdminSiteTemplate, ApiError> {
    let site = state.site(&slug).await?;
    let settings = site.settings().await?;

    let mut stored: Vec<Page> = site.storage.store.list().await?;
    stored.sort_by(|a, b| a.slug.cmp(&b.slug));
    let editing: Vec<_> = site.sessions.read().await.keys().copied().collect();
    let pages = stored
        .into_iter()
        .map(|page| PageRow {
            page_id: page.page_id.to_string(),
            editing: editing.contains(&page.page_id),
            published: page.status == PageStatus::Published,
            updated_at: page.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            slug: page.slug,
            title: page.title,
        })
        .collect();

    let activity = site
        .storage
        .recent_activity(RECENT_ACTIVITY)?
        .into_iter()
        .map(ActivityRow::from)
        .collect();

    Ok(AdminSiteTemplate {
        public_url: format!("{}/sites/{}", state.public_base_url, slug),
        slug,
        name: settings.name,
        tagline: settings.tagline.unwrap_or_default(),
        pages,
        activity,
    })
}

/// GET /admin/sites/{site}/logs?limit= - Newest-first activity log.
pub async fn site_logs(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    render(load_logs(&state, slug, query.limit.unwrap_or(DEFAULT_LOG_LIMIT)).await)
}

async fn load_logs(
    state: &SharedState,
    slug: String,
    limit: usize,
) -> Result<AdminLogsTemplate, ApiError> {
    let site = state.site(&slug).await?;
    let limit = limit.max(1);
    let activity = site
        .storage
        .recent_activity(limit)?
        .into_iter()
        .map(ActivityRow::from)
        .collect();
    Ok(AdminLogsTemplate {
        slug,
        limit,
        activity,
    })
}

/// GET /admin/sites/{site}/pages/{id}/preview?bp= - Render any page,
/// published or not. An open editing session's current blocks are shown in
/// place of the stored ones.
pub async fn page_preview(
    State(state): State<SharedState>,
    Path((slug, id)): Path<(String, String)>,
    Query(query): Query<ViewQuery>,
    headers: HeaderMap,
) -> Response {
    render(load_preview(&state, &slug, &id, &query, &headers).await)
}

async fn load_preview(
    state: &SharedState,
    slug: &str,
    id: &str,
    query: &ViewQuery,
    headers: &HeaderMap,
) -> Result<PageTemplate, ApiError> {
    let page_id = parse_id(id, "page")?;
    let site = state.site(slug).await?;
    let settings = site.settings().await?;
    let page = load_page(&site, page_id).await?;
    let breakpoint = breakpoint_for(query, headers);

    let mut resolver = TreeResolver::new(&site.storage.store, breakpoint);
    let session = site.session(page_id).await;
    if let Some(handle) = &session {
        let current = handle.read_state().await;
        resolver = resolver.with_overlay(current.columns.clone(), current.blocks().to_vec());
    }
    let resolved = resolver.resolve_page(page).await?;

    let banner = PreviewBanner {
        path: format!("/admin/sites/{}/pages/{}/preview", slug, page_id),
        from_session: session.is_some(),
    };
    PageTemplate::build(&resolved, &settings, site.slug(), Some(banner))
}
