//! Highlighter interface
//!
//! The highlighter captures selections and draws highlight markup into the
//! displayed document. Drawing takes the color as part of the request, so
//! the active capture color is never used as a painting side channel.

use thiserror::Error;

use crate::annotations::{AnnotationMarker, HighlightPayload};

/// Errors raised while drawing one highlight
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    /// The stored range no longer matches the document content
    #[error("Range for highlight {highlight_id} not found in document")]
    RangeNotFound { highlight_id: String },

    #[error("Document error: {0}")]
    Document(String),
}

/// One highlight to draw
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub annotation_id: &'a str,
    pub payload: &'a HighlightPayload,
    pub color: &'a str,
    pub marker: AnnotationMarker,
}

/// Window of the displayed document
pub trait ViewportWindow: Send + Sync {
    /// Top offset of a rendered highlight, if present
    fn highlight_offset(&self, highlight_id: &str) -> Option<f64>;

    fn inner_height(&self) -> f64;

    fn scroll_to(&self, y: f64);
}

pub trait Highlighter: Send + Sync {
    /// Whether the displayed document finished loading
    fn is_document_ready(&self) -> bool;

    fn document_scroll_height(&self) -> f64;

    /// Color applied to the next user capture
    fn color(&self) -> String;

    fn set_color(&self, color: &str);

    fn create_highlight_dom(&self, request: &RenderRequest<'_>) -> Result<(), RenderError>;

    fn destroy_highlight(&self, highlight_id: &str);

    fn destroy_all_highlights(&self);

    /// Re-read layout dependent geometry after the viewport changed
    fn refresh_layout(&self) {}

    fn window(&self) -> &dyn ViewportWindow;
}

/// Convert `#rgb` / `#rrggbb` to a half transparent `rgba()` value
pub fn hex_to_rgba(hex: &str) -> Option<String> {
    let digits = hex.strip_prefix('#')?;
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let value = u32::from_str_radix(&expanded, 16).ok()?;
    Some(format!(
        "rgba({},{},{},0.5)",
        (value >> 16) & 255,
        (value >> 8) & 255,
        value & 255
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgba() {
        assert_eq!(hex_to_rgba("#ff0000").as_deref(), Some("rgba(255,0,0,0.5)"));
        assert_eq!(hex_to_rgba("#0f8").as_deref(), Some("rgba(0,255,136,0.5)"));
    }

    #[test]
    fn test_hex_to_rgba_rejects_bad_input() {
        assert!(hex_to_rgba("red").is_none());
        assert!(hex_to_rgba("#12345").is_none());
        assert!(hex_to_rgba("#zzzzzz").is_none());
    }
}
