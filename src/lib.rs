//! Annotation anchoring and reconciliation for web publication readers.
//!
//! Captured highlights become chapter-scoped [`Annotation`] records, are
//! written remote first (when a remote is configured) and then locally, and
//! are redrawn for the displayed chapter on every navigation or resize.

pub mod anchor;
pub mod annotations;
pub mod config;
pub mod coordinator;
pub mod highlighter;
pub mod mock;
pub mod module;
pub mod navigator;
pub mod publication;
pub mod reconcile;
pub mod remote;
pub mod sidebar;
pub mod store;

pub use anchor::{AnchorResolver, ResolvedChapter};
pub use annotations::{
    Annotation, AnnotationError, AnnotationMarker, HighlightPayload, InitialAnnotations, Result,
};
pub use config::AnnotationSettings;
pub use coordinator::{DeleteOutcome, PendingAnnotation, PersistenceCoordinator};
pub use highlighter::{Highlighter, RenderRequest, ViewportWindow};
pub use module::{AnnotationModule, Collaborators};
pub use navigator::Navigator;
pub use publication::{DocumentModel, Link, Locator, Publication};
pub use reconcile::{ReconcileOutcome, ReconcileReport, ReconcileStrategy, SkipReason};
pub use remote::{HttpAnnotationApi, RemoteAnnotationApi};
pub use store::{AnnotationStore, JsonFileStore, MemoryAnnotationStore};
