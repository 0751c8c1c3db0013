//! Annotation error types

use thiserror::Error;

use crate::highlighter::RenderError;
use crate::remote::RemoteError;
use crate::store::StoreError;

/// Errors surfaced by annotation operations
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// No table-of-contents entry matched the displayed chapter
    #[error("No chapter identity resolves for {href}")]
    Resolution { href: String },

    /// The remote authority rejected or never confirmed the call
    #[error("Remote sync failed: {0}")]
    RemoteSync(#[from] RemoteError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to render annotation {id}: {source}")]
    Render {
        id: String,
        #[source]
        source: RenderError,
    },

    #[error("Annotations are disabled for this reader")]
    Disabled,

    #[error("Highlighter is not initialized")]
    HighlighterMissing,
}

impl AnnotationError {
    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteSync(err) => err.is_retryable(),
            Self::Store(StoreError::Io(_)) => true,
            _ => false,
        }
    }
}

/// Result type alias for annotation operations
pub type Result<T> = std::result::Result<T, AnnotationError>;
