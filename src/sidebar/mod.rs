//! Annotation sidebar
//!
//! Groups every stored annotation under the reading-order chapter that owns
//! it, for navigation and deletion. Chapters without annotations are left
//! out; nested chapters keep their depth.

mod builder;
mod render;

use serde::Serialize;

use crate::annotations::Annotation;
use crate::publication::Locator;

pub use builder::{build_tree, readable_timestamp};
pub use render::render_tree;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AnnotationTree {
    pub sections: Vec<ChapterSection>,
}

impl AnnotationTree {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of annotation items across all sections
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}

/// One chapter with its annotations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterSection {
    /// Nesting depth in the reading order, 0 for top-level entries
    pub depth: usize,
    pub header: ChapterHeader,
    pub items: Vec<AnnotationItem>,
}

/// Navigable chapter heading, opening at the start of the resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterHeader {
    pub href: String,
    pub title: String,
    pub locator: Locator,
}

/// Style applied to the preview text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MarkerStyle {
    /// 2px bottom border in the given color
    Underline { border: String },
    Fill { background: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationItem {
    pub id: String,
    pub preview: String,
    pub style: MarkerStyle,
    /// e.g. "42% through resource"
    pub progression_label: String,
    pub timestamp: String,
    pub locator: Locator,
    pub deletable: bool,
    #[serde(skip)]
    pub annotation: Annotation,
}

impl AnnotationItem {
    /// Action for clicking the item
    pub fn navigate_action(&self) -> SidebarAction {
        SidebarAction::Navigate(self.locator.clone())
    }

    /// Action for the delete button, when shown
    pub fn delete_action(&self) -> Option<SidebarAction> {
        self.deletable
            .then(|| SidebarAction::Delete(self.annotation.clone()))
    }
}

/// User interaction raised from the sidebar
#[derive(Debug, Clone, PartialEq)]
pub enum SidebarAction {
    Navigate(Locator),
    Delete(Annotation),
}
