//! Annotation persistence
//!
//! The local store is the durable source for every reconciliation pass. It
//! holds at most one record per id.

mod json_store;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::annotations::Annotation;
use crate::highlighter::ViewportWindow;

pub use json_store::JsonFileStore;
pub use memory::MemoryAnnotationStore;

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait AnnotationStore: Send + Sync {
    async fn get_annotations(&self) -> StoreResult<Vec<Annotation>>;

    /// Insert or replace the record with the same id
    async fn save_annotation(&self, annotation: &Annotation) -> StoreResult<Annotation>;

    /// Remove a record, returning it when it existed
    async fn delete_annotation(&self, id: &str) -> StoreResult<Option<Annotation>>;

    /// Top offset of the record's highlight in the given window
    async fn annotation_position(
        &self,
        id: &str,
        window: &dyn ViewportWindow,
    ) -> StoreResult<Option<f64>> {
        let annotations = self.get_annotations().await?;
        Ok(annotations
            .iter()
            .find(|a| a.id == id)
            .and_then(|a| window.highlight_offset(&a.highlight.id)))
    }

    /// Replace the stored set with a seed, returning the number of records kept
    async fn init_annotations(&self, seed: Vec<Annotation>) -> StoreResult<usize>;
}

/// Collapse records sharing an id, keeping the last occurrence in its first slot
pub(crate) fn dedup_by_id(records: Vec<Annotation>) -> Vec<Annotation> {
    let mut out: Vec<Annotation> = Vec::with_capacity(records.len());
    for record in records {
        match out.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record,
            None => out.push(record),
        }
    }
    out
}

/// Upsert into a list, returning whether an existing record was replaced
pub(crate) fn upsert(records: &mut Vec<Annotation>, annotation: &Annotation) -> bool {
    match records.iter_mut().find(|existing| existing.id == annotation.id) {
        Some(existing) => {
            *existing = annotation.clone();
            true
        }
        None => {
            records.push(annotation.clone());
            false
        }
    }
}
