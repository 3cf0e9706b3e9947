// ABOUTME: ApiError, the error type returned by every JSON handler.
// ABOUTME: Maps core and storage failures to an HTTP status plus a category-based JSON body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagewright_core::content::FieldError;
use pagewright_core::{ActorError, Categorized, ContentError, ErrorCategory, StoreError};
use pagewright_store::{ActivityError, ManagerError, SnapshotError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("submission has invalid fields")]
    InvalidSubmission(Vec<FieldError>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Actor(#[from] ActorError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Activity(#[from] ActivityError),

    #[error("export failed: {0}")]
    Export(#[from] serde_yaml::Error),

    #[error("render failed: {0}")]
    Render(#[from] askama::Error),
}

impl Categorized for ApiError {
    fn category(&self) -> ErrorCategory {
        match self {
            ApiError::NotFound(_) | ApiError::BadRequest(_) | ApiError::InvalidSubmission(_) => {
                ErrorCategory::Validation
            }
            ApiError::Store(e) => e.category(),
            ApiError::Actor(e) => e.category(),
            ApiError::Content(e) => e.category(),
            ApiError::Manager(
                ManagerError::InvalidSlug(_)
                | ManagerError::SiteNotFound(_)
                | ManagerError::SiteExists(_),
            ) => ErrorCategory::Validation,
            ApiError::Manager(_)
            | ApiError::Snapshot(_)
            | ApiError::Activity(_)
            | ApiError::Export(_) => ErrorCategory::Storage,
            ApiError::Render(_) => ErrorCategory::Unknown,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::Manager(ManagerError::SiteNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::BadRequest(_)
            | ApiError::Manager(ManagerError::InvalidSlug(_))
            | ApiError::Actor(ActorError::BlockNotFound(_) | ActorError::DuplicateBlock(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(StoreError::SlugTaken(_))
            | ApiError::Manager(ManagerError::SiteExists(_)) => StatusCode::CONFLICT,
            ApiError::InvalidSubmission(_)
            | ApiError::Content(_)
            | ApiError::Actor(ActorError::InvalidBlock { .. } | ActorError::UnplacedBlock(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let category = self.category();

        // Server-side failures keep their details in the log only
        let error = if status.is_server_error() {
            tracing::error!("request failed: {}", self);
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let mut body = serde_json::json!({
            "error": error,
            "category": category,
            "message": category.user_message(),
        });
        if let ApiError::InvalidSubmission(fields) = &self {
            body["fields"] = serde_json::json!(fields);
        }

        (status, Json(body)).into_response()
    }
}
