//! Reader-facing annotation module
//!
//! Wires the resolver, the persistence coordinator and the render pipeline to
//! the host's collaborators, and exposes the operations a reader calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::anchor::AnchorResolver;
use crate::annotations::{
    Annotation, AnnotationError, AnnotationMarker, HighlightPayload, InitialAnnotations, Result,
    SelectionInfo,
};
use crate::config::{AnnotationSettings, UiOptions};
use crate::coordinator::{DeleteOutcome, PersistenceCoordinator};
use crate::highlighter::Highlighter;
use crate::navigator::Navigator;
use crate::publication::DocumentModel;
use crate::reconcile::{ReconcileOutcome, RenderPipeline};
use crate::remote::RemoteAnnotationApi;
use crate::sidebar::{build_tree, AnnotationTree, SidebarAction};
use crate::store::AnnotationStore;

/// Host services the module depends on
#[derive(Clone)]
pub struct Collaborators {
    pub document: Arc<dyn DocumentModel>,
    pub navigator: Arc<dyn Navigator>,
    pub store: Arc<dyn AnnotationStore>,
    pub remote: Option<Arc<dyn RemoteAnnotationApi>>,
}

pub struct AnnotationModule {
    settings: AnnotationSettings,
    ui: RwLock<UiOptions>,
    resolver: AnchorResolver,
    coordinator: PersistenceCoordinator,
    pipeline: RenderPipeline,
    highlighter: RwLock<Option<Arc<dyn Highlighter>>>,
    resize_ticket: AtomicU64,
}

impl AnnotationModule {
    /// Build the module and seed the store from `initial` when given
    pub async fn create(
        settings: AnnotationSettings,
        collaborators: Collaborators,
        initial: Option<InitialAnnotations>,
    ) -> Result<Self> {
        let resolver = AnchorResolver::new(collaborators.document, collaborators.navigator);
        let coordinator =
            PersistenceCoordinator::new(collaborators.store.clone(), collaborators.remote);
        let pipeline = RenderPipeline::new(
            resolver.clone(),
            collaborators.store,
            settings.strategy,
            settings.rights.enable_annotations,
        );
        pipeline.set_initial_color(settings.initial_annotation_color.clone());

        let module = Self {
            ui: RwLock::new(settings.ui.clone()),
            settings,
            resolver,
            coordinator,
            pipeline,
            highlighter: RwLock::new(None),
            resize_ticket: AtomicU64::new(0),
        };
        module.start(initial).await?;
        Ok(module)
    }

    async fn start(&self, initial: Option<InitialAnnotations>) -> Result<()> {
        if let Some(initial) = initial {
            let count = self
                .coordinator
                .store()
                .init_annotations(initial.highlights)
                .await?;
            log::info!("Annotation module started with {} annotations", count);
        } else {
            log::info!("Annotation module started");
        }
        Ok(())
    }

    pub fn settings(&self) -> &AnnotationSettings {
        &self.settings
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Attach the highlighter and draw once the document had time to settle
    pub async fn initialize(
        &self,
        highlighter: Arc<dyn Highlighter>,
        initial_color: Option<String>,
    ) -> Result<ReconcileOutcome> {
        if self.settings.rights.enable_annotations {
            let previous = write(&self.highlighter).replace(highlighter);
            // The registry describes the old document, not the new one
            if let Some(previous) = previous {
                let removed = self.pipeline.clear(previous.as_ref());
                log::debug!("Highlighter replaced, {} highlights dropped", removed);
            }
        }
        if initial_color.is_some() {
            self.pipeline.set_initial_color(initial_color);
        }

        tokio::time::sleep(self.settings.initial_draw_delay()).await;
        self.draw_highlights().await
    }

    /// Gate called before a selection becomes a highlight
    pub fn on_before_highlight(&self, _selection: &SelectionInfo) -> bool {
        true
    }

    /// Persist a freshly captured highlight and redraw
    pub async fn on_after_highlight(
        &self,
        payload: HighlightPayload,
        marker: AnnotationMarker,
    ) -> Result<Annotation> {
        let highlighter = self.enabled_highlighter()?;
        let saved = self
            .coordinator
            .create(&self.resolver, payload, marker, highlighter.as_ref())
            .await?;
        self.redraw().await;
        Ok(saved)
    }

    pub async fn get_annotations(&self) -> Result<Vec<Annotation>> {
        Ok(self.coordinator.store().get_annotations().await?)
    }

    /// Store a record as-is, locally only
    pub async fn add_annotation(&self, annotation: &Annotation) -> Result<Annotation> {
        let saved = self.coordinator.store().save_annotation(annotation).await?;
        self.redraw().await;
        Ok(saved)
    }

    /// Remove a record locally only
    pub async fn delete_annotation(&self, annotation: &Annotation) -> Result<DeleteOutcome> {
        let outcome = self.coordinator.delete_local(&annotation.id).await?;
        if outcome.is_deleted() {
            self.redraw().await;
        }
        Ok(outcome)
    }

    /// Remove a record, confirming with the remote first when configured
    pub async fn delete_highlight(&self, annotation: &Annotation) -> Result<DeleteOutcome> {
        let outcome = self.coordinator.delete(&annotation.id).await?;
        if outcome.is_deleted() {
            self.redraw().await;
        }
        Ok(outcome)
    }

    /// Scroll so the highlight sits a third of the way down the viewport
    pub async fn scroll_to_highlight(&self, id: &str) -> Result<bool> {
        let highlighter = self.current_highlighter()?;
        let window = highlighter.window();
        let position = self
            .coordinator
            .store()
            .annotation_position(id, window)
            .await?;

        match position {
            Some(position) => {
                window.scroll_to(position - window.inner_height() / 3.0);
                Ok(true)
            }
            None => {
                log::debug!("No drawn highlight for annotation {}", id);
                Ok(false)
            }
        }
    }

    /// Redraw after the viewport settled; superseded calls return `None`
    pub async fn handle_resize(&self) -> Result<Option<ReconcileOutcome>> {
        let ticket = self.resize_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.settings.resize_debounce()).await;

        if self.resize_ticket.load(Ordering::SeqCst) != ticket {
            log::debug!("Resize redraw {} superseded", ticket);
            return Ok(None);
        }

        if let Some(highlighter) = self.highlighter() {
            highlighter.refresh_layout();
        }
        self.draw_highlights().await.map(Some)
    }

    pub async fn draw_highlights(&self) -> Result<ReconcileOutcome> {
        let highlighter = self.highlighter();
        self.pipeline.reconcile(highlighter.as_deref()).await
    }

    /// Sidebar tree over every stored annotation
    pub async fn show_highlights(&self) -> Result<AnnotationTree> {
        let annotations = self.get_annotations().await?;
        let ui = read(&self.ui).clone();
        Ok(build_tree(
            self.resolver.document().as_ref(),
            &annotations,
            &ui,
        ))
    }

    pub fn set_side_nav_expanded(&self, expanded: bool) {
        write(&self.ui).side_nav_expanded = expanded;
    }

    pub async fn handle_sidebar_action(&self, action: SidebarAction) -> Result<()> {
        match action {
            SidebarAction::Navigate(locator) => {
                self.resolver.navigator().navigate(&locator);
                Ok(())
            }
            SidebarAction::Delete(annotation) => {
                self.delete_highlight(&annotation).await?;
                Ok(())
            }
        }
    }

    /// Remove drawn highlights and detach the highlighter
    pub fn stop(&self) {
        if let Some(highlighter) = write(&self.highlighter).take() {
            let removed = self.pipeline.clear(highlighter.as_ref());
            log::info!("Annotation module stopped, {} highlights removed", removed);
        }
    }

    async fn redraw(&self) {
        if let Err(err) = self.draw_highlights().await {
            log::error!("Redraw failed: {}", err);
        }
    }

    fn highlighter(&self) -> Option<Arc<dyn Highlighter>> {
        read(&self.highlighter).clone()
    }

    fn current_highlighter(&self) -> Result<Arc<dyn Highlighter>> {
        self.highlighter().ok_or(AnnotationError::HighlighterMissing)
    }

    fn enabled_highlighter(&self) -> Result<Arc<dyn Highlighter>> {
        if !self.settings.rights.enable_annotations {
            return Err(AnnotationError::Disabled);
        }
        self.current_highlighter()
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
