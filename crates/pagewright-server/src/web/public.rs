// ABOUTME: Public page rendering: resolves a published page for the request's breakpoint and renders it.
// ABOUTME: Drafts and unknown slugs get the not-found page; other failures get the error panel.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use pagewright_core::TreeResolver;

use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::viewport::{ViewQuery, breakpoint_for};
use crate::web::{PageTemplate, html_error};

/// GET /sites/{site} - The site's home page.
pub async fn site_home(
    State(state): State<SharedState>,
    Path(site): Path<String>,
    Query(query): Query<ViewQuery>,
    headers: HeaderMap,
) -> Response {
    respond(render_published(&state, &site, None, &query, &headers).await)
}

/// GET /sites/{site}/{slug}
pub async fn site_page(
    State(state): State<SharedState>,
    Path((site, slug)): Path<(String, String)>,
    Query(query): Query<ViewQuery>,
    headers: HeaderMap,
) -> Response {
    respond(render_published(&state, &site, Some(slug), &query, &headers).await)
}

fn respond(result: Result<PageTemplate, ApiError>) -> Response {
    match result {
        Ok(page) => {
            let mut resp = page.into_response();
            // Rendering depends on the viewport hint
            resp.headers_mut().insert(
                header::VARY,
                HeaderValue::from_static("Sec-CH-Viewport-Width, Viewport-Width"),
            );
            resp
        }
        Err(e) => html_error(e),
    }
}

async fn render_published(
    state: &SharedState,
    site_slug: &str,
    slug: Option<String>,
    query: &ViewQuery,
    headers: &HeaderMap,
) -> Result<PageTemplate, ApiError> {
    let site = state.site(site_slug).await?;
    let settings = site.settings().await?;
    let slug = slug.unwrap_or_else(|| settings.home_slug.clone());
    let breakpoint = breakpoint_for(query, headers);

    let resolved = TreeResolver::new(&site.storage.store, breakpoint)
        .resolve_slug(&slug)
        .await?
        .filter(|resolved| resolved.page.is_published())
        .ok_or_else(|| ApiError::NotFound("page".to_string()))?;

    tracing::debug!(
        site = site_slug,
        slug = %slug,
        breakpoint = %breakpoint,
        blocks = resolved.block_count(),
        "rendering page"
    );
    PageTemplate::build(&resolved, &settings, site.slug(), None)
}
