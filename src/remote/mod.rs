//! Remote annotation authority
//!
//! An optional remote API that confirms creations (possibly assigning a new
//! id) and deletions. Local writes only follow a confirmed remote call.

mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::annotations::Annotation;

pub use http::HttpAnnotationApi;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Authentication failed")]
    AuthFailed,
    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Remote response carried no annotation id")]
    MissingId,
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
    #[error("Remote capability not configured: {0}")]
    NotConfigured(&'static str),
}

impl RemoteError {
    /// Whether the call may succeed when repeated (transport failures, 5xx)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Server { status, .. } => *status >= 500,
            Self::Unavailable(_) => true,
            _ => false,
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Which remote operations are wired up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCapabilities {
    pub add: bool,
    pub delete: bool,
}

impl RemoteCapabilities {
    pub const ALL: Self = Self {
        add: true,
        delete: true,
    };
}

#[async_trait]
pub trait RemoteAnnotationApi: Send + Sync {
    fn capabilities(&self) -> RemoteCapabilities {
        RemoteCapabilities::ALL
    }

    /// Persist a draft remotely, returning the record with the authoritative id
    async fn add_annotation(&self, annotation: &Annotation) -> RemoteResult<Annotation>;

    async fn delete_annotation(&self, annotation: &Annotation) -> RemoteResult<()>;
}
