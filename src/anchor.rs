//! Chapter identity resolution
//!
//! Maps the displayed resource onto the absolute href stamped on annotations.
//! The navigator's loaded resource and its explicit TOC URL can disagree, so
//! lookups follow a fixed fallback order and the first hit wins.

use std::sync::Arc;

use crate::annotations::{AnnotationError, Result};
use crate::navigator::Navigator;
use crate::publication::{DocumentModel, Link};

/// Canonical identity of the displayed chapter
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChapter {
    /// Absolute URL used for storage and matching
    pub href: String,
    /// Table-of-contents entry that produced the href
    pub entry: Link,
    /// Link of the loaded resource, as the navigator reports it
    pub chapter: Link,
}

#[derive(Clone)]
pub struct AnchorResolver {
    document: Arc<dyn DocumentModel>,
    navigator: Arc<dyn Navigator>,
}

impl AnchorResolver {
    pub fn new(document: Arc<dyn DocumentModel>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            document,
            navigator,
        }
    }

    pub fn document(&self) -> &Arc<dyn DocumentModel> {
        &self.document
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Resolve the chapter identity of the displayed resource
    pub fn resolve(&self) -> Result<ResolvedChapter> {
        let chapter = self.navigator.current_chapter_link();
        let chapter_href = chapter.href_str();

        let mut entry = self.document.toc_item(chapter_href);

        // An explicit TOC URL replaces the chapter lookup, even when it misses
        if let Some(toc_url) = self.navigator.current_toc_url() {
            entry = self.document.toc_item(&toc_url);
        }

        // Resources outside the primary reading order are only reachable by absolute href
        if entry.is_none() {
            entry = self
                .document
                .absolute_href(chapter_href)
                .and_then(|absolute| self.document.toc_item_absolute(&absolute));
        }

        let entry = entry.ok_or_else(|| AnnotationError::Resolution {
            href: chapter_href.to_string(),
        })?;

        let href = entry
            .href
            .as_deref()
            .and_then(|href| self.document.absolute_href(href))
            .ok_or_else(|| AnnotationError::Resolution {
                href: chapter_href.to_string(),
            })?;

        Ok(ResolvedChapter {
            href,
            entry,
            chapter,
        })
    }
}
