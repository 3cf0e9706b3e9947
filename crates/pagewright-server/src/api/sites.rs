// ABOUTME: Site API handlers: list and create tenants, read and replace their settings.
// ABOUTME: Every tenant gets its own directory, document store, and activity log.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use pagewright_core::{DocumentStore, SiteSettings};
use pagewright_store::ActivityEntry;
use serde::{Deserialize, Serialize};

use crate::app_state::SharedState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct SiteSummary {
    pub slug: String,
    pub name: String,
    pub tagline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub theme_color: Option<String>,
}

/// GET /api/sites - List every known site.
pub async fn list_sites(State(state): State<SharedState>) -> Result<Json<Vec<SiteSummary>>, ApiError> {
    state.load_sites().await?;

    let mut summaries = Vec::new();
    for slug in state.site_slugs().await {
        let site = state.site(&slug).await?;
        let settings = site.settings().await?;
        summaries.push(SiteSummary {
            slug,
            name: settings.name,
            tagline: settings.tagline,
        });
    }
    Ok(Json(summaries))
}

/// POST /api/sites - Create a site with initial settings.
pub async fn create_site(
    State(state): State<SharedState>,
    Json(req): Json<CreateSiteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut settings = SiteSettings::new(req.name);
    settings.tagline = req.tagline;
    if let Some(color) = req.theme_color {
        settings.theme_color = color;
    }
    check_settings(&settings)?;

    state.create_site(&req.slug, &settings).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "slug": req.slug })),
    ))
}

/// GET /api/sites/{site}/settings
pub async fn get_settings(
    State(state): State<SharedState>,
    Path(site): Path<String>,
) -> Result<Json<SiteSettings>, ApiError> {
    let site = state.site(&site).await?;
    Ok(Json(site.settings().await?))
}

/// PUT /api/sites/{site}/settings - Replace the site's settings.
pub async fn put_settings(
    State(state): State<SharedState>,
    Path(site): Path<String>,
    Json(settings): Json<SiteSettings>,
) -> Result<Json<SiteSettings>, ApiError> {
    check_settings(&settings)?;
    let site = state.site(&site).await?;
    site.storage.store.put_settings(&settings).await?;
    site.storage
        .record(ActivityEntry::new("settings_updated", Some(site.slug().to_string())));
    Ok(Json(settings))
}

fn check_settings(settings: &SiteSettings) -> Result<(), ApiError> {
    if settings.name.trim().is_empty() {
        return Err(ApiError::BadRequest("site name must not be empty".to_string()));
    }
    if settings.valid_theme_color().is_none() {
        return Err(ApiError::BadRequest(format!(
            "theme colour must be a hex literal like #3366ff, got {}",
            settings.theme_color
        )));
    }
    Ok(())
}
