//! Persistence coordination between the local store and the remote authority
//!
//! A new annotation exists as a [`PendingAnnotation`] until it is committed.
//! With a remote configured, commit happens only after the remote confirmed
//! the record, and the local copy is stored under the id the remote returned.
//! Deletes run remote first as well; the local record survives a failed
//! remote delete so the call can be repeated.

use std::sync::Arc;

use chrono::Utc;

use crate::anchor::AnchorResolver;
use crate::annotations::{
    clamp_progression, Annotation, AnnotationMarker, AnnotationText, HighlightPayload,
    Locations, Result,
};
use crate::highlighter::Highlighter;
use crate::remote::{RemoteAnnotationApi, RemoteCapabilities};
use crate::store::AnnotationStore;

/// A drafted annotation not yet written anywhere
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAnnotation {
    draft: Annotation,
}

impl PendingAnnotation {
    pub fn draft(&self) -> &Annotation {
        &self.draft
    }

    /// Adopt the id the remote assigned
    pub fn confirm(self, remote: &Annotation) -> Annotation {
        let mut record = self.draft;
        record.id = remote.id.clone();
        record
    }

    /// Keep the locally generated id
    pub fn into_local(self) -> Annotation {
        self.draft
    }
}

/// Result of a delete request
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(Annotation),
    NothingDeleted,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }
}

pub struct PersistenceCoordinator {
    store: Arc<dyn AnnotationStore>,
    remote: Option<Arc<dyn RemoteAnnotationApi>>,
}

impl PersistenceCoordinator {
    pub fn new(
        store: Arc<dyn AnnotationStore>,
        remote: Option<Arc<dyn RemoteAnnotationApi>>,
    ) -> Self {
        Self { store, remote }
    }

    pub fn store(&self) -> &Arc<dyn AnnotationStore> {
        &self.store
    }

    /// Build a record for a captured highlight in the displayed chapter
    pub fn draft(
        &self,
        resolver: &AnchorResolver,
        payload: HighlightPayload,
        marker: AnnotationMarker,
        highlighter: &dyn Highlighter,
    ) -> Result<PendingAnnotation> {
        let chapter = resolver.resolve()?;

        let scroll_height = highlighter.document_scroll_height();
        // A zero offset carries no placement, like a missing one
        let progression = match payload.position {
            Some(offset) if offset > 0.0 && scroll_height > 0.0 => offset / scroll_height,
            _ => resolver.navigator().current_position(),
        };

        let text = payload.selection_info.clean_text.clone();
        let draft = Annotation {
            id: Annotation::new_local_id(),
            href: chapter.href,
            locations: Locations {
                progression: clamp_progression(progression),
            },
            created: Utc::now(),
            media_type: chapter.chapter.media_type,
            title: chapter.chapter.title,
            highlight: payload,
            color: highlighter.color(),
            marker,
            text: AnnotationText { highlight: text },
        };
        Ok(PendingAnnotation { draft })
    }

    /// Write a pending record: remote first when configured, then local
    pub async fn commit(&self, pending: PendingAnnotation) -> Result<Annotation> {
        let record = match self.remote_with(|caps| caps.add) {
            Some(remote) => {
                let confirmed = remote
                    .add_annotation(pending.draft())
                    .await
                    .map_err(|err| {
                        log::warn!(
                            "Remote add failed for annotation {}: {}",
                            pending.draft().id,
                            err
                        );
                        err
                    })?;
                pending.confirm(&confirmed)
            }
            None => pending.into_local(),
        };

        let saved = self.store.save_annotation(&record).await?;
        log::info!("Created annotation {} in {}", saved.id, saved.href);
        Ok(saved)
    }

    /// Draft and commit in one step
    pub async fn create(
        &self,
        resolver: &AnchorResolver,
        payload: HighlightPayload,
        marker: AnnotationMarker,
        highlighter: &dyn Highlighter,
    ) -> Result<Annotation> {
        let pending = self.draft(resolver, payload, marker, highlighter)?;
        self.commit(pending).await
    }

    /// Delete a record: remote first when configured, then local
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome> {
        let annotations = self.store.get_annotations().await?;
        let Some(record) = annotations.into_iter().find(|a| a.id == id) else {
            log::debug!("Delete of unknown annotation {} ignored", id);
            return Ok(DeleteOutcome::NothingDeleted);
        };

        if let Some(remote) = self.remote_with(|caps| caps.delete) {
            remote.delete_annotation(&record).await.map_err(|err| {
                log::warn!("Remote delete failed for annotation {}: {}", id, err);
                err
            })?;
        }

        self.delete_local(id).await
    }

    /// Remove a record from the local store only
    pub async fn delete_local(&self, id: &str) -> Result<DeleteOutcome> {
        match self.store.delete_annotation(id).await? {
            Some(removed) => {
                log::info!("Deleted annotation {}", id);
                Ok(DeleteOutcome::Deleted(removed))
            }
            None => Ok(DeleteOutcome::NothingDeleted),
        }
    }

    fn remote_with(
        &self,
        capability: impl Fn(RemoteCapabilities) -> bool,
    ) -> Option<&Arc<dyn RemoteAnnotationApi>> {
        self.remote
            .as_ref()
            .filter(|remote| capability(remote.capabilities()))
    }
}
