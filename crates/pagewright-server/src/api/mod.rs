// ABOUTME: JSON API module for pagewright, organizing all REST endpoint handlers.
// ABOUTME: Submodules cover sites, pages, tree nodes, builder sessions, SSE streaming, and forms.

pub mod builder;
pub mod forms;
pub mod nodes;
pub mod pages;
pub mod sites;
pub mod stream;

use ulid::Ulid;

use crate::error::ApiError;

/// Parse a path segment as a ULID, naming what it identifies on failure.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Ulid, ApiError> {
    raw.parse::<Ulid>()
        .map_err(|_| ApiError::BadRequest(format!("invalid {} id", what)))
}
