//! Publication data models
//!
//! Shapes of a Readium web publication manifest, reduced to what annotation
//! anchoring needs.

use serde::{Deserialize, Serialize};

/// A link in the reading order or table of contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Relative or absolute href; section-only nodes have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Link>,
}

impl Link {
    pub fn new(href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            media_type: None,
            title: Some(title.into()),
            children: Vec::new(),
        }
    }

    /// A title-only node grouping its children
    pub fn section(title: impl Into<String>, children: Vec<Link>) -> Self {
        Self {
            href: None,
            media_type: None,
            title: Some(title.into()),
            children,
        }
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Link>) -> Self {
        self.children = children;
        self
    }

    pub fn href_str(&self) -> &str {
        self.href.as_deref().unwrap_or("")
    }
}

/// Location details inside a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LocatorLocations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progression: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
}

/// A navigation target handed to the navigator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Locator {
    pub href: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub locations: LocatorLocations,
}

impl Locator {
    /// Start of a resource
    pub fn start_of(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            media_type: None,
            title: None,
            locations: LocatorLocations {
                progression: Some(0.0),
                fragment: None,
            },
        }
    }
}

/// Publication-level metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Raw web publication manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub reading_order: Vec<Link>,

    #[serde(default)]
    pub toc: Vec<Link>,
}
