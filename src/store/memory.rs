//! In-memory annotation store

use std::sync::Mutex;

use async_trait::async_trait;

use super::{dedup_by_id, upsert, AnnotationStore, StoreResult};
use crate::annotations::Annotation;

/// Store kept in process memory, for hosts without durable storage and for tests
#[derive(Default)]
pub struct MemoryAnnotationStore {
    annotations: Mutex<Vec<Annotation>>,
}

impl MemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store
    pub fn with_annotations(self, annotations: Vec<Annotation>) -> Self {
        *self.lock() = dedup_by_id(annotations);
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().iter().any(|a| a.id == id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Annotation>> {
        match self.annotations.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl AnnotationStore for MemoryAnnotationStore {
    async fn get_annotations(&self) -> StoreResult<Vec<Annotation>> {
        Ok(self.lock().clone())
    }

    async fn save_annotation(&self, annotation: &Annotation) -> StoreResult<Annotation> {
        upsert(&mut self.lock(), annotation);
        Ok(annotation.clone())
    }

    async fn delete_annotation(&self, id: &str) -> StoreResult<Option<Annotation>> {
        let mut annotations = self.lock();
        Ok(annotations
            .iter()
            .position(|a| a.id == id)
            .map(|index| annotations.remove(index)))
    }

    async fn init_annotations(&self, seed: Vec<Annotation>) -> StoreResult<usize> {
        let mut annotations = self.lock();
        *annotations = dedup_by_id(seed);
        Ok(annotations.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{AnnotationMarker, AnnotationText, HighlightPayload, Locations};
    use crate::highlighter::Highlighter;
    use crate::mock::MockHighlighter;
    use chrono::Utc;

    fn annotation(id: &str) -> Annotation {
        Annotation {
            id: id.to_string(),
            href: "https://x/1".to_string(),
            locations: Locations { progression: 0.1 },
            created: Utc::now(),
            media_type: None,
            title: None,
            highlight: HighlightPayload::new(format!("h-{id}"), "t"),
            color: "#ff0000".to_string(),
            marker: AnnotationMarker::Highlight,
            text: AnnotationText::default(),
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_record_per_id() {
        let store = MemoryAnnotationStore::new();
        store.save_annotation(&annotation("a")).await.unwrap();
        store.save_annotation(&annotation("a")).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_annotation_position_uses_window_offset() {
        let store = MemoryAnnotationStore::new().with_annotations(vec![annotation("a")]);
        let highlighter = MockHighlighter::new().with_offset("h-a", 640.0);

        let position = store
            .annotation_position("a", highlighter.window())
            .await
            .unwrap();
        assert_eq!(position, Some(640.0));

        let missing = store
            .annotation_position("zzz", highlighter.window())
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}
