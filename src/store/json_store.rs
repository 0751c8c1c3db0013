//! File-backed annotation store
//!
//! Keeps every annotation of one publication in a single JSON array file.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{dedup_by_id, upsert, AnnotationStore, StoreError, StoreResult};
use crate::annotations::Annotation;

/// Annotation store persisted as `annotations.json`
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store at the given file path, creating parent directories
    pub fn new(path: PathBuf) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Default store location under the user's data directory
    pub fn default_path() -> StoreResult<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("marginalia").join("annotations.json"))
            .ok_or_else(|| StoreError::NotFound("Data directory not found".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<Vec<Annotation>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let annotations: Vec<Annotation> = serde_json::from_str(&content)?;
        Ok(annotations)
    }

    fn write_all(&self, annotations: &[Annotation]) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(annotations)?;
        // Write to a sibling file first so a crash never leaves a truncated store
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl AnnotationStore for JsonFileStore {
    async fn get_annotations(&self) -> StoreResult<Vec<Annotation>> {
        self.read_all()
    }

    async fn save_annotation(&self, annotation: &Annotation) -> StoreResult<Annotation> {
        let _guard = self.write_lock.lock().await;
        let mut annotations = self.read_all()?;
        let replaced = upsert(&mut annotations, annotation);
        self.write_all(&annotations)?;

        log::debug!(
            "{} annotation {} in {:?}",
            if replaced { "Replaced" } else { "Saved" },
            annotation.id,
            self.path
        );
        Ok(annotation.clone())
    }

    async fn delete_annotation(&self, id: &str) -> StoreResult<Option<Annotation>> {
        let _guard = self.write_lock.lock().await;
        let mut annotations = self.read_all()?;
        let Some(index) = annotations.iter().position(|a| a.id == id) else {
            return Ok(None);
        };
        let removed = annotations.remove(index);
        self.write_all(&annotations)?;

        log::debug!("Deleted annotation {} from {:?}", id, self.path);
        Ok(Some(removed))
    }

    async fn init_annotations(&self, seed: Vec<Annotation>) -> StoreResult<usize> {
        let _guard = self.write_lock.lock().await;
        let annotations = dedup_by_id(seed);
        self.write_all(&annotations)?;

        log::info!("Seeded {} annotations into {:?}", annotations.len(), self.path);
        Ok(annotations.len())
    }
}
