// ABOUTME: HTTP server for pagewright: JSON API, builder sessions over SSE, public pages, and the admin dashboard.
// ABOUTME: Uses Axum with per-site storage and one builder actor per open editing session.

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod viewport;
pub mod web;

#[cfg(test)]
mod test_support;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, PagewrightConfig};
pub use error::ApiError;
pub use routes::create_router;
