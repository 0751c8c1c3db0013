//! Annotation module
//!
//! Records, capture payloads and the error taxonomy shared by every layer.

pub mod errors;
mod models;

pub use errors::{AnnotationError, Result};
pub use models::{
    clamp_progression, Annotation, AnnotationMarker, AnnotationText, HighlightPayload,
    InitialAnnotations, Locations, SelectionInfo,
};
