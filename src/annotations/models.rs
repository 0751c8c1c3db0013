//! Annotation data models
//!
//! An annotation is a user highlight pinned to one chapter of a publication.
//! Records are position independent: they carry the chapter's absolute href and
//! a fractional progression instead of any live DOM reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::publication::Locator;

/// Highlight rendering style
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationMarker {
    /// Background fill behind the selected text
    #[default]
    Highlight,
    /// Bottom border under the selected text
    Underline,
}

impl AnnotationMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Highlight => "highlight",
            Self::Underline => "underline",
        }
    }
}

impl std::fmt::Display for AnnotationMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of the text the user selected
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectionInfo {
    /// Selected text with markup and redundant whitespace removed
    pub clean_text: String,

    /// Serialized range description, opaque to this crate
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub range_info: serde_json::Value,
}

/// Capture payload produced by the highlighter for one selection.
///
/// Owned exclusively by the annotation record that stores it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HighlightPayload {
    /// Identifier of the highlight element in the rendered document
    pub id: String,

    /// Vertical offset of the selected range within the document, in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,

    pub selection_info: SelectionInfo,

    /// Marker style applied when the payload is drawn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<AnnotationMarker>,
}

impl HighlightPayload {
    pub fn new(id: impl Into<String>, clean_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: None,
            selection_info: SelectionInfo {
                clean_text: clean_text.into(),
                range_info: serde_json::Value::Null,
            },
            marker: None,
        }
    }

    pub fn with_position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_range_info(mut self, range_info: serde_json::Value) -> Self {
        self.selection_info.range_info = range_info;
        self
    }
}

/// Position of an annotation inside its resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Locations {
    /// Fraction of the resource preceding the highlight, in `[0, 1]`
    pub progression: f64,
}

/// Plain-text snapshot shown in the sidebar preview
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnnotationText {
    pub highlight: String,
}

/// A persisted, chapter-scoped highlight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Local UUID at creation; replaced by the remote id once the remote confirms
    pub id: String,

    /// Absolute URL of the owning chapter
    pub href: String,

    pub locations: Locations,

    /// Creation timestamp, never modified
    pub created: DateTime<Utc>,

    /// Media type of the owning chapter at capture time
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Title of the owning chapter at capture time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub highlight: HighlightPayload,

    /// Hex color active in the highlighter at capture time
    pub color: String,

    pub marker: AnnotationMarker,

    pub text: AnnotationText,
}

impl Annotation {
    /// Generate a fresh local identifier
    pub fn new_local_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn progression(&self) -> f64 {
        self.locations.progression
    }

    /// Locator pointing at this annotation, for navigation
    pub fn locator(&self) -> Locator {
        Locator {
            href: self.href.clone(),
            media_type: self.media_type.clone(),
            title: self.title.clone(),
            locations: crate::publication::LocatorLocations {
                progression: Some(self.locations.progression),
                fragment: None,
            },
        }
    }

    /// Payload as it should be drawn, carrying this record's marker
    pub fn render_payload(&self) -> HighlightPayload {
        let mut payload = self.highlight.clone();
        payload.marker = Some(self.marker);
        payload
    }
}

/// Seed document accepted at startup
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InitialAnnotations {
    #[serde(default)]
    pub highlights: Vec<Annotation>,
}

/// Clamp a raw progression into `[0, 1]`, mapping non-finite values to 0
pub fn clamp_progression(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Annotation {
        Annotation {
            id: "a1".to_string(),
            href: "https://example.org/book/ch1.xhtml".to_string(),
            locations: Locations { progression: 0.25 },
            created: Utc::now(),
            media_type: Some("application/xhtml+xml".to_string()),
            title: Some("Chapter 1".to_string()),
            highlight: HighlightPayload::new("h1", "call me Ishmael").with_position(120.0),
            color: "#ff0000".to_string(),
            marker: AnnotationMarker::Underline,
            text: AnnotationText {
                highlight: "call me Ishmael".to_string(),
            },
        }
    }

    #[test]
    fn test_serializes_type_and_text_fields() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "application/xhtml+xml");
        assert_eq!(json["text"]["highlight"], "call me Ishmael");
        assert_eq!(json["marker"], "underline");
        assert_eq!(json["locations"]["progression"], 0.25);
        assert_eq!(json["highlight"]["selectionInfo"]["cleanText"], "call me Ishmael");
    }

    #[test]
    fn test_render_payload_carries_marker() {
        let annotation = sample();
        assert_eq!(annotation.highlight.marker, None);
        assert_eq!(
            annotation.render_payload().marker,
            Some(AnnotationMarker::Underline)
        );
    }

    #[test]
    fn test_clamp_progression() {
        assert_eq!(clamp_progression(1.7), 1.0);
        assert_eq!(clamp_progression(-0.2), 0.0);
        assert_eq!(clamp_progression(f64::NAN), 0.0);
        assert_eq!(clamp_progression(0.4), 0.4);
    }

    #[test]
    fn test_seed_defaults_to_empty() {
        let seed: InitialAnnotations = serde_json::from_str("{}").unwrap();
        assert!(seed.highlights.is_empty());
    }
}
