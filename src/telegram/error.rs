//! Messaging error types

use thiserror::Error;

/// Chat platform error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct MessagingError {
    pub kind: MessagingErrorKind,
    pub message: String,
}

impl MessagingError {
    pub fn new(kind: MessagingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_modified(message: impl Into<String>) -> Self {
        Self::new(MessagingErrorKind::NotModified, message)
    }

    pub fn message_gone(message: impl Into<String>) -> Self {
        Self::new(MessagingErrorKind::MessageGone, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(MessagingErrorKind::Transport, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(MessagingErrorKind::Api, message)
    }

    /// The edit target exists but could not take this edit
    pub fn is_edit_conflict(&self) -> bool {
        self.kind.is_edit_conflict()
    }

    /// Classify a Bot API error description
    pub fn from_description(description: &str) -> Self {
        let lower = description.to_ascii_lowercase();
        if lower.contains("message is not modified") {
            Self::not_modified(description)
        } else if lower.contains("message to edit not found")
            || lower.contains("message can't be edited")
            || lower.contains("message to delete not found")
            || lower.contains("message can't be deleted")
        {
            Self::message_gone(description)
        } else {
            Self::api(description)
        }
    }
}

/// Error classification for edit fallback logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingErrorKind {
    /// Edit carried identical content
    NotModified,
    /// Target message deleted or too old to edit
    MessageGone,
    /// Timeout, connection failure, unreadable response
    Transport,
    /// Any other API rejection
    Api,
}

impl MessagingErrorKind {
    pub fn is_edit_conflict(&self) -> bool {
        matches!(self, Self::NotModified | Self::MessageGone)
    }
}

/// Failure of a best-effort call. Never aborts a turn.
#[derive(Debug, Error)]
#[error("ignored {0}")]
pub struct Ignorable(#[from] pub MessagingError);

impl Ignorable {
    /// Log and drop
    pub fn discard(self, operation: &'static str) {
        tracing::warn!(operation, kind = ?self.0.kind, error = %self.0, "Best-effort call failed");
    }
}
