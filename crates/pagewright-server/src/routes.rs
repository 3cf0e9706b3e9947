// ABOUTME: Route table for the pagewright HTTP server.
// ABOUTME: Assembles the JSON API, public site pages, and admin views into one Axum Router with shared state.

use axum::Router;
use axum::routing::{get, post};
use pagewright_core::{Block, Column, Section};
use tower_http::trace::TraceLayer;

use crate::api::{builder, forms, nodes, pages, sites, stream};
use crate::app_state::SharedState;
use crate::web::{admin, favicon, public};

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    let api = Router::new()
        .route("/sites", get(sites::list_sites).post(sites::create_site))
        .route(
            "/sites/{site}/settings",
            get(sites::get_settings).put(sites::put_settings),
        )
        .route(
            "/sites/{site}/pages",
            get(pages::list_pages).post(pages::create_page),
        )
        .route(
            "/sites/{site}/pages/{id}",
            get(pages::get_page)
                .put(pages::update_page)
                .delete(pages::delete_page),
        )
        .route("/sites/{site}/pages/{id}/export", get(pages::export_page))
        .route(
            "/sites/{site}/pages/{id}/builder",
            post(builder::open_session).delete(builder::close_session),
        )
        .route(
            "/sites/{site}/pages/{id}/builder/commands",
            post(builder::submit_command),
        )
        .route(
            "/sites/{site}/pages/{id}/builder/state",
            get(builder::get_session_state),
        )
        .route(
            "/sites/{site}/pages/{id}/builder/stream",
            get(stream::builder_stream),
        )
        .route("/sites/{site}/sections", post(nodes::put_section))
        .route(
            "/sites/{site}/sections/{id}",
            get(nodes::get_node::<Section>).delete(nodes::delete_node::<Section>),
        )
        .route("/sites/{site}/columns", post(nodes::put_column))
        .route(
            "/sites/{site}/columns/{id}",
            get(nodes::get_node::<Column>).delete(nodes::delete_node::<Column>),
        )
        .route("/sites/{site}/blocks", post(nodes::put_block))
        .route(
            "/sites/{site}/blocks/{id}",
            get(nodes::get_node::<Block>).delete(nodes::delete_node::<Block>),
        )
        .route("/sites/{site}/forms/{id}", post(forms::submit_form));

    let admin = Router::new()
        .route("/", get(admin::dashboard))
        .route("/sites/{site}", get(admin::site_overview))
        .route("/sites/{site}/logs", get(admin::site_logs))
        .route(
            "/sites/{site}/pages/{id}/preview",
            get(admin::page_preview),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest("/admin", admin)
        .route("/sites/{site}", get(public::site_home))
        .route("/sites/{site}/favicon.svg", get(favicon::favicon))
        .route("/sites/{site}/{slug}", get(public::site_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler. Returns 200 OK with a simple JSON body.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
