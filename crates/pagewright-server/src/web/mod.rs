// ABOUTME: Browser-facing routes: published pages, generated favicons, and the admin dashboard.
// ABOUTME: Failures render as HTML (a not-found page or an error panel) rather than JSON.

pub mod admin;
pub mod favicon;
pub mod public;

use askama::Template;
use askama_derive_axum::IntoResponse as AskamaIntoResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagewright_core::{Breakpoint, Categorized, Page, ResolvedPage, SiteSettings};

use crate::error::ApiError;
use crate::render::render_sections;

/// A full HTML document for one page at one breakpoint.
#[derive(Template, AskamaIntoResponse)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub site_slug: String,
    pub title: String,
    pub description: String,
    pub no_index: bool,
    pub theme_color: String,
    pub breakpoint: Breakpoint,
    pub tokens_css: String,
    pub custom_css: String,
    pub custom_js: String,
    pub body: String,
    /// Set when an editor is previewing; shows a banner with breakpoint links.
    pub preview: bool,
    pub preview_path: String,
    pub from_session: bool,
}

/// Where an editor preview came from.
pub struct PreviewBanner {
    pub path: String,
    pub from_session: bool,
}

#[derive(Template, AskamaIntoResponse)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub what: String,
}

#[derive(Template, AskamaIntoResponse)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub message: &'static str,
}

/// Keep author-supplied CSS/JS from closing the element it is embedded in.
fn embed_safe(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| c.trim().replace("</", "<\\/"))
        .unwrap_or_default()
}

impl PageTemplate {
    pub fn build(
        resolved: &ResolvedPage,
        settings: &SiteSettings,
        site_slug: &str,
        preview: Option<PreviewBanner>,
    ) -> Result<Self, ApiError> {
        let page: &Page = &resolved.page;
        let seo = &page.settings.seo;
        let title = match seo.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => format!("{} | {}", page.title, settings.name),
        };

        Ok(Self {
            site_slug: site_slug.to_string(),
            title,
            description: seo.description.clone().unwrap_or_default(),
            no_index: seo.no_index || preview.is_some(),
            theme_color: settings
                .valid_theme_color()
                .unwrap_or("#3366ff")
                .to_string(),
            breakpoint: resolved.breakpoint,
            tokens_css: page.settings.tokens_css(),
            custom_css: embed_safe(&page.settings.custom_css),
            custom_js: embed_safe(&page.settings.custom_js),
            body: render_sections(resolved, site_slug)?,
            preview: preview.is_some(),
            preview_path: preview.as_ref().map(|p| p.path.clone()).unwrap_or_default(),
            from_session: preview.is_some_and(|p| p.from_session),
        })
    }
}

/// Render an error as an HTML page with the matching status.
pub(crate) fn html_error(err: ApiError) -> Response {
    let status = err.status();
    if status == StatusCode::NOT_FOUND {
        return (
            status,
            NotFoundTemplate {
                what: "page".to_string(),
            },
        )
            .into_response();
    }
    if status.is_server_error() {
        tracing::error!("page render failed: {}", err);
    }
    (
        status,
        ErrorTemplate {
            message: err.category().user_message(),
        },
    )
        .into_response()
}
