// ABOUTME: Coarse error categories and the static user-facing message for each.
// ABOUTME: Core error types report their category so every surface can map them uniformly.

use serde::Serialize;

use crate::actor::ActorError;
use crate::content::ContentError;
use crate::history::HistoryError;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Network,
    Auth,
    Validation,
    Storage,
    Unknown,
}

impl ErrorCategory {
    /// Message safe to show to a site visitor or editor. Never includes
    /// details of the underlying failure.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorCategory::Network => "We couldn't reach the server. Check your connection and try again.",
            ErrorCategory::Auth => "You don't have permission to do that.",
            ErrorCategory::Validation => "Some of the information provided isn't valid.",
            ErrorCategory::Storage => "We couldn't load or save your content right now.",
            ErrorCategory::Unknown => "Something went wrong. Please try again.",
        }
    }
}

/// Implemented by error types that can be shown to users via a category.
pub trait Categorized {
    fn category(&self) -> ErrorCategory;
}

impl Categorized for StoreError {
    fn category(&self) -> ErrorCategory {
        match self {
            StoreError::SlugTaken(_) => ErrorCategory::Validation,
            StoreError::Backend(_) | StoreError::Serde(_) => ErrorCategory::Storage,
        }
    }
}

impl Categorized for ActorError {
    fn category(&self) -> ErrorCategory {
        match self {
            ActorError::BlockNotFound(_)
            | ActorError::DuplicateBlock(_)
            | ActorError::InvalidBlock { .. }
            | ActorError::UnplacedBlock(_) => ErrorCategory::Validation,
            ActorError::SaveFailed(err) => err.category(),
            ActorError::ChannelClosed => ErrorCategory::Unknown,
        }
    }
}

impl Categorized for ContentError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

impl Categorized for HistoryError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_conflicts_are_validation_errors() {
        let err = StoreError::SlugTaken("home".to_string());
        assert_eq!(err.category(), ErrorCategory::Validation);
        let err = StoreError::Backend("disk full".into());
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn user_messages_do_not_leak_details() {
        let err = StoreError::Backend("/var/lib/secret/site.db: locked".into());
        let msg = err.category().user_message();
        assert!(!msg.contains("secret"));
        assert!(!msg.is_empty());
    }
}
