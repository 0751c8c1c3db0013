//! Document model: table-of-contents lookups and href resolution

use std::fs;
use std::path::Path;

use reqwest::Url;
use thiserror::Error;

use super::models::{Link, Manifest};

/// Error type for publication loading
#[derive(Debug, Error)]
pub enum PublicationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Structure of the displayed publication.
///
/// Lookups return owned links so callers never hold borrows across awaits.
pub trait DocumentModel: Send + Sync {
    /// Find the entry for a href relative to the publication base
    fn toc_item(&self, href: &str) -> Option<Link>;

    /// Find the entry whose absolute href matches an absolute URL
    fn toc_item_absolute(&self, href: &str) -> Option<Link>;

    /// Resolve a href against the publication base
    fn absolute_href(&self, href: &str) -> Option<String>;

    fn reading_order(&self) -> &[Link];

    fn toc(&self) -> &[Link];
}

/// Drop any `#fragment` from a href
pub fn strip_fragment(href: &str) -> &str {
    match href.find('#') {
        Some(idx) => &href[..idx],
        None => href,
    }
}

/// A web publication resolved against its manifest URL
#[derive(Debug, Clone)]
pub struct Publication {
    base_url: Url,
    manifest: Manifest,
}

impl Publication {
    pub fn new(base_url: &str, manifest: Manifest) -> Result<Self, PublicationError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PublicationError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self { base_url, manifest })
    }

    /// Parse a manifest document
    pub fn from_manifest_json(base_url: &str, json: &str) -> Result<Self, PublicationError> {
        let manifest: Manifest = serde_json::from_str(json)?;
        Self::new(base_url, manifest)
    }

    /// Load a manifest file from disk
    pub fn load(path: &Path, base_url: &str) -> Result<Self, PublicationError> {
        let content = fs::read_to_string(path)?;
        let publication = Self::from_manifest_json(base_url, &content)?;
        log::debug!(
            "Loaded publication {:?} with {} reading order entries",
            publication.title(),
            publication.manifest.reading_order.len()
        );
        Ok(publication)
    }

    pub fn title(&self) -> Option<&str> {
        self.manifest.metadata.title.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, href: &str) -> Option<Url> {
        self.base_url.join(href).ok()
    }

    /// Search the table of contents first, then the reading order
    fn find_by_url(&self, target: &Url) -> Option<Link> {
        find_link(&self.manifest.toc, target, self)
            .or_else(|| find_link(&self.manifest.reading_order, target, self))
    }
}

fn without_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

fn find_link(links: &[Link], target: &Url, publication: &Publication) -> Option<Link> {
    for link in links {
        if let Some(href) = link.href.as_deref() {
            if let Some(url) = publication.resolve(href) {
                if without_fragment(url) == *target {
                    return Some(link.clone());
                }
            }
        }
        if let Some(found) = find_link(&link.children, target, publication) {
            return Some(found);
        }
    }
    None
}

impl DocumentModel for Publication {
    fn toc_item(&self, href: &str) -> Option<Link> {
        let target = without_fragment(self.resolve(href)?);
        self.find_by_url(&target)
    }

    fn toc_item_absolute(&self, href: &str) -> Option<Link> {
        let target = without_fragment(Url::parse(href).ok()?);
        self.find_by_url(&target)
    }

    fn absolute_href(&self, href: &str) -> Option<String> {
        self.resolve(href).map(|url| url.to_string())
    }

    fn reading_order(&self) -> &[Link] {
        &self.manifest.reading_order
    }

    fn toc(&self) -> &[Link] {
        &self.manifest.toc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.org/books/moby/manifest.json";

    fn publication() -> Publication {
        let manifest = Manifest {
            reading_order: vec![
                Link::new("text/ch1.xhtml", "Loomings").with_type("application/xhtml+xml"),
                Link::new("text/ch2.xhtml", "The Carpet-Bag"),
                Link::new("https://cdn.example.org/extra/appendix.xhtml", "Appendix"),
            ],
            toc: vec![Link::section(
                "Part One",
                vec![
                    Link::new("text/ch1.xhtml#start", "Chapter 1. Loomings"),
                    Link::new("text/ch2.xhtml", "Chapter 2. The Carpet-Bag"),
                ],
            )],
            ..Default::default()
        };
        Publication::new(BASE, manifest).unwrap()
    }

    #[test]
    fn test_absolute_href_resolves_against_manifest() {
        let publication = publication();
        assert_eq!(
            publication.absolute_href("text/ch1.xhtml").unwrap(),
            "https://example.org/books/moby/text/ch1.xhtml"
        );
    }

    #[test]
    fn test_toc_item_prefers_toc_and_ignores_fragment() {
        let publication = publication();
        let link = publication.toc_item("text/ch1.xhtml").unwrap();
        assert_eq!(link.title.as_deref(), Some("Chapter 1. Loomings"));
    }

    #[test]
    fn test_toc_item_falls_back_to_reading_order() {
        let publication = publication();
        let link = publication
            .toc_item("https://cdn.example.org/extra/appendix.xhtml")
            .unwrap();
        assert_eq!(link.title.as_deref(), Some("Appendix"));
    }

    #[test]
    fn test_toc_item_absolute_requires_absolute_url() {
        let publication = publication();
        assert!(publication.toc_item_absolute("text/ch2.xhtml").is_none());
        let link = publication
            .toc_item_absolute("https://example.org/books/moby/text/ch2.xhtml")
            .unwrap();
        assert_eq!(link.title.as_deref(), Some("Chapter 2. The Carpet-Bag"));
    }

    #[test]
    fn test_unknown_href_returns_none() {
        assert!(publication().toc_item("text/missing.xhtml").is_none());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = Publication::new("not a url", Manifest::default()).unwrap_err();
        assert!(matches!(err, PublicationError::InvalidUrl(_)));
    }

    #[test]
    fn test_strip_fragment() {
        assert_eq!(strip_fragment("a.xhtml#p1"), "a.xhtml");
        assert_eq!(strip_fragment("a.xhtml"), "a.xhtml");
    }
}
