//! Navigator interface
//!
//! The navigator owns the displayed resource. Annotation code only reads its
//! notion of the current chapter and asks it to move.

use crate::publication::{Link, Locator};

pub trait Navigator: Send + Sync {
    /// Link of the resource currently loaded in the view
    fn current_chapter_link(&self) -> Link;

    /// Explicit table-of-contents URL, set when the reader navigated through
    /// a TOC entry that does not map onto the loaded resource
    fn current_toc_url(&self) -> Option<String>;

    /// Current page-view position within the resource, in `[0, 1]`
    fn current_position(&self) -> f64;

    fn navigate(&self, locator: &Locator);
}
