//! Publication module
//!
//! Table of contents, reading order and href resolution for the displayed
//! publication.

mod document;
mod models;

pub use document::{strip_fragment, DocumentModel, Publication, PublicationError};
pub use models::{Link, Locator, LocatorLocations, Manifest, Metadata};
