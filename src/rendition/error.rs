//! Rendition error types

use thiserror::Error;

/// Errors raised while generating renditions
///
/// Lookups that find nothing are not errors; they return `None`, `false` or `0`.
#[derive(Debug, Error)]
pub enum RenditionError {
    /// No profile registered under this id
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile exists but is switched off
    #[error("Profile disabled: {0}")]
    ProfileDisabled(String),

    /// Profile restricts source types and the document's is not among them
    #[error("Source MIME type {mime_type} not supported by profile {profile_id}")]
    UnsupportedSourceType {
        profile_id: String,
        mime_type: String,
    },

    /// A handler failed to transform the document
    #[error("Handler for {rendition_type} failed: {message}")]
    Handler {
        rendition_type: String,
        message: String,
    },

    /// A blocking handler panicked or was cancelled
    #[error("Handler task failed: {0}")]
    TaskFailed(String),

    /// A handler did not return within the configured timeout
    #[error("Handler timed out after {0} seconds")]
    Timeout(u64),
}

impl RenditionError {
    /// Convenience constructor for handler implementations
    pub fn handler(rendition_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            rendition_type: rendition_type.into(),
            message: message.into(),
        }
    }

    /// Whether the error comes from profile configuration rather than rendering
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ProfileNotFound(_) | Self::ProfileDisabled(_) | Self::UnsupportedSourceType { .. }
        )
    }
}

/// Result type alias for rendition operations
pub type Result<T> = std::result::Result<T, RenditionError>;
