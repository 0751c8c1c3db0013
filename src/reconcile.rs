//! Highlight reconciliation
//!
//! Keeps the drawn highlights equal to the stored annotations of the
//! displayed chapter. Passes may overlap; each one takes a generation number
//! and only the newest pass is allowed to draw.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::anchor::AnchorResolver;
use crate::annotations::{Annotation, AnnotationError, Result};
use crate::highlighter::{Highlighter, RenderRequest};
use crate::store::AnnotationStore;

/// How a pass updates the drawn set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStrategy {
    /// Clear everything, then draw the chapter's records
    #[default]
    Full,
    /// Diff against what was drawn for the same chapter
    Incremental,
}

/// Highlights currently drawn, by annotation id
#[derive(Debug, Default)]
pub struct RenderRegistry {
    chapter_href: Option<String>,
    drawn: HashMap<String, String>,
}

impl RenderRegistry {
    /// Chapter the registry was drawn for
    pub fn chapter_href(&self) -> Option<&str> {
        self.chapter_href.as_deref()
    }

    pub fn contains(&self, annotation_id: &str) -> bool {
        self.drawn.contains_key(annotation_id)
    }

    pub fn len(&self) -> usize {
        self.drawn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawn.is_empty()
    }

    fn reset(&mut self) -> usize {
        let removed = self.drawn.len();
        self.drawn.clear();
        self.chapter_href = None;
        removed
    }
}

/// Why a pass did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoHighlighter,
    DocumentNotReady,
    /// A newer pass started while this one was loading records
    Superseded,
}

/// Summary of one completed pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub generation: u64,
    pub chapter_href: String,
    /// Highlights drawn by this pass
    pub rendered: usize,
    /// Highlights left in place by an incremental pass
    pub retained: usize,
    pub skipped_other_chapters: usize,
    /// Annotation ids whose highlight could not be drawn
    pub failed: Vec<String>,
    /// Highlights destroyed by this pass
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Completed(ReconcileReport),
    Skipped(SkipReason),
}

impl ReconcileOutcome {
    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }
}

/// Sole writer of drawn highlight state
pub struct RenderPipeline {
    resolver: AnchorResolver,
    store: Arc<dyn AnnotationStore>,
    strategy: ReconcileStrategy,
    enabled: bool,
    initial_color: Mutex<Option<String>>,
    generation: AtomicU64,
    registry: Mutex<RenderRegistry>,
}

impl RenderPipeline {
    pub fn new(
        resolver: AnchorResolver,
        store: Arc<dyn AnnotationStore>,
        strategy: ReconcileStrategy,
        enabled: bool,
    ) -> Self {
        Self {
            resolver,
            store,
            strategy,
            enabled,
            initial_color: Mutex::new(None),
            generation: AtomicU64::new(0),
            registry: Mutex::new(RenderRegistry::default()),
        }
    }

    pub fn strategy(&self) -> ReconcileStrategy {
        self.strategy
    }

    /// Capture color restored at the end of every pass
    pub fn set_initial_color(&self, color: Option<String>) {
        *lock(&self.initial_color) = color;
    }

    /// Generation of the most recently started pass
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Annotation ids currently drawn
    pub fn drawn_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.registry().drawn.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Destroy every drawn highlight
    pub fn clear(&self, highlighter: &dyn Highlighter) -> usize {
        let mut registry = self.registry();
        highlighter.destroy_all_highlights();
        registry.reset()
    }

    /// Bring the drawn highlights in line with the store
    pub async fn reconcile(
        &self,
        highlighter: Option<&dyn Highlighter>,
    ) -> Result<ReconcileOutcome> {
        if !self.enabled {
            return Ok(self.skip(SkipReason::Disabled));
        }
        let Some(highlighter) = highlighter else {
            return Ok(self.skip(SkipReason::NoHighlighter));
        };
        if !highlighter.is_document_ready() {
            return Ok(self.skip(SkipReason::DocumentNotReady));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let report = match self.strategy {
            ReconcileStrategy::Full => self.full_pass(highlighter, generation).await?,
            ReconcileStrategy::Incremental => {
                self.incremental_pass(highlighter, generation).await?
            }
        };

        let Some(report) = report else {
            return Ok(self.skip(SkipReason::Superseded));
        };

        if let Some(color) = lock(&self.initial_color).as_deref() {
            highlighter.set_color(color);
        }

        log::debug!(
            "Reconcile pass {} for {}: {} drawn, {} retained, {} removed, {} failed",
            report.generation,
            report.chapter_href,
            report.rendered,
            report.retained,
            report.removed,
            report.failed.len()
        );
        Ok(ReconcileOutcome::Completed(report))
    }

    async fn full_pass(
        &self,
        highlighter: &dyn Highlighter,
        generation: u64,
    ) -> Result<Option<ReconcileReport>> {
        let removed = self.clear(highlighter);

        let annotations = self.store.get_annotations().await?;
        let chapter = self.resolver.resolve()?;

        let mut registry = self.registry();
        if self.generation() != generation {
            return Ok(None);
        }
        // A pass that overlapped this one may have drawn after our clear
        if !registry.is_empty() {
            highlighter.destroy_all_highlights();
            registry.reset();
        }

        let mut report = ReconcileReport {
            generation,
            chapter_href: chapter.href.clone(),
            removed,
            ..Default::default()
        };
        for annotation in &annotations {
            if annotation.href != chapter.href {
                report.skipped_other_chapters += 1;
                continue;
            }
            draw(highlighter, &mut registry, annotation, &mut report);
        }
        registry.chapter_href = Some(chapter.href);
        Ok(Some(report))
    }

    async fn incremental_pass(
        &self,
        highlighter: &dyn Highlighter,
        generation: u64,
    ) -> Result<Option<ReconcileReport>> {
        let chapter = match self.resolver.resolve() {
            Ok(chapter) => chapter,
            Err(err) => {
                self.clear(highlighter);
                return Err(err);
            }
        };

        let annotations = self.store.get_annotations().await?;

        let mut registry = self.registry();
        if self.generation() != generation {
            return Ok(None);
        }

        let mut report = ReconcileReport {
            generation,
            chapter_href: chapter.href.clone(),
            ..Default::default()
        };

        if registry.chapter_href() != Some(chapter.href.as_str()) {
            highlighter.destroy_all_highlights();
            report.removed = registry.reset();
        }

        let wanted: HashMap<&str, &Annotation> = annotations
            .iter()
            .filter(|a| a.href == chapter.href)
            .map(|a| (a.id.as_str(), a))
            .collect();
        report.skipped_other_chapters = annotations.len() - wanted.len();

        let stale: Vec<String> = registry
            .drawn
            .iter()
            .filter(|(id, highlight_id)| {
                wanted
                    .get(id.as_str())
                    .map_or(true, |a| &a.highlight.id != *highlight_id)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            if let Some(highlight_id) = registry.drawn.remove(&id) {
                highlighter.destroy_highlight(&highlight_id);
                report.removed += 1;
            }
        }

        let mut seen = HashSet::new();
        for annotation in annotations.iter().filter(|a| a.href == chapter.href) {
            if !seen.insert(annotation.id.as_str()) {
                continue;
            }
            if registry.contains(&annotation.id) {
                report.retained += 1;
                continue;
            }
            draw(highlighter, &mut registry, annotation, &mut report);
        }
        registry.chapter_href = Some(chapter.href);
        Ok(Some(report))
    }

    fn skip(&self, reason: SkipReason) -> ReconcileOutcome {
        log::debug!("Reconcile pass skipped: {:?}", reason);
        ReconcileOutcome::Skipped(reason)
    }

    fn registry(&self) -> MutexGuard<'_, RenderRegistry> {
        lock(&self.registry)
    }
}

fn draw(
    highlighter: &dyn Highlighter,
    registry: &mut RenderRegistry,
    annotation: &Annotation,
    report: &mut ReconcileReport,
) {
    let payload = annotation.render_payload();
    let request = RenderRequest {
        annotation_id: &annotation.id,
        payload: &payload,
        color: &annotation.color,
        marker: annotation.marker,
    };
    match highlighter.create_highlight_dom(&request) {
        Ok(()) => {
            registry
                .drawn
                .insert(annotation.id.clone(), payload.id.clone());
            report.rendered += 1;
        }
        Err(source) => {
            let err = AnnotationError::Render {
                id: annotation.id.clone(),
                source,
            };
            log::error!("{}", err);
            report.failed.push(annotation.id.clone());
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{test_annotation, MockHighlighter, MockNavigator};
    use crate::publication::{Link, Manifest, Publication};
    use crate::store::MemoryAnnotationStore;

    const BASE: &str = "https://example.org/book/manifest.json";
    const CH1: &str = "https://example.org/book/ch1.xhtml";
    const CH2: &str = "https://example.org/book/ch2.xhtml";

    struct Fixture {
        pipeline: RenderPipeline,
        navigator: Arc<MockNavigator>,
        store: Arc<MemoryAnnotationStore>,
        highlighter: MockHighlighter,
    }

    fn fixture(strategy: ReconcileStrategy, annotations: Vec<Annotation>) -> Fixture {
        let manifest = Manifest {
            reading_order: vec![Link::new("ch1.xhtml", "One"), Link::new("ch2.xhtml", "Two")],
            ..Default::default()
        };
        let publication = Arc::new(Publication::new(BASE, manifest).unwrap());
        let navigator = Arc::new(MockNavigator::at(Link::new("ch1.xhtml", "One")));
        let store = Arc::new(MemoryAnnotationStore::new().with_annotations(annotations));
        let pipeline = RenderPipeline::new(
            AnchorResolver::new(publication, navigator.clone()),
            store.clone(),
            strategy,
            true,
        );
        Fixture {
            pipeline,
            navigator,
            store,
            highlighter: MockHighlighter::new(),
        }
    }

    fn seed() -> Vec<Annotation> {
        vec![
            test_annotation("a", CH1),
            test_annotation("b", CH2),
            test_annotation("c", CH1),
        ]
    }

    #[tokio::test]
    async fn test_draws_only_current_chapter() {
        let f = fixture(ReconcileStrategy::Full, seed());
        let outcome = f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.rendered, 2);
        assert_eq!(report.skipped_other_chapters, 1);
        assert_eq!(report.chapter_href, CH1);
        assert_eq!(f.highlighter.drawn_ids(), vec!["a", "c"]);
        assert_eq!(f.pipeline.drawn_ids(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_draw_request_carries_record_color() {
        let mut red = test_annotation("a", CH1);
        red.color = "#ff0000".to_string();
        let mut blue = test_annotation("c", CH1);
        blue.color = "#0000ff".to_string();
        let f = fixture(ReconcileStrategy::Full, vec![red, blue]);
        f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();

        let colors: Vec<String> = f.highlighter.drawn().into_iter().map(|h| h.color).collect();
        assert_eq!(colors, vec!["#ff0000", "#0000ff"]);
        // Capture color untouched without an override
        assert_eq!(f.highlighter.color(), "#ffff00");
    }

    #[tokio::test]
    async fn test_initial_color_is_restored_last() {
        let f = fixture(ReconcileStrategy::Full, seed());
        f.pipeline.set_initial_color(Some("#00ff00".to_string()));
        f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();
        assert_eq!(f.highlighter.color(), "#00ff00");
    }

    #[tokio::test]
    async fn test_navigation_replaces_drawn_set() {
        let f = fixture(ReconcileStrategy::Full, seed());
        f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();

        f.navigator.set_chapter(Link::new("ch2.xhtml", "Two"));
        let outcome = f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.removed, 2);
        assert_eq!(f.highlighter.drawn_ids(), vec!["b"]);
        assert_eq!(report.generation, 2);
    }

    #[tokio::test]
    async fn test_render_failure_does_not_abort_pass() {
        let mut f = fixture(ReconcileStrategy::Full, seed());
        f.highlighter = MockHighlighter::new().with_failing_highlight("h-a");
        let outcome = f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.failed, vec!["a".to_string()]);
        assert_eq!(f.highlighter.drawn_ids(), vec!["c"]);
    }

    #[tokio::test]
    async fn test_guards_skip_pass() {
        let f = fixture(ReconcileStrategy::Full, seed());
        assert_eq!(
            f.pipeline.reconcile(None).await.unwrap(),
            ReconcileOutcome::Skipped(SkipReason::NoHighlighter)
        );

        f.highlighter.set_ready(false);
        assert_eq!(
            f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap(),
            ReconcileOutcome::Skipped(SkipReason::DocumentNotReady)
        );
        assert_eq!(f.highlighter.clear_calls(), 0);
        assert_eq!(f.pipeline.generation(), 0);
    }

    #[tokio::test]
    async fn test_disabled_pipeline_skips() {
        let f = fixture(ReconcileStrategy::Full, seed());
        let disabled = RenderPipeline::new(
            f.pipeline.resolver.clone(),
            f.store.clone(),
            ReconcileStrategy::Full,
            false,
        );
        assert_eq!(
            disabled.reconcile(Some(&f.highlighter)).await.unwrap(),
            ReconcileOutcome::Skipped(SkipReason::Disabled)
        );
    }

    #[tokio::test]
    async fn test_resolution_failure_clears_and_errors() {
        let f = fixture(ReconcileStrategy::Full, seed());
        f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();

        f.navigator.set_chapter(Link::new("unknown.xhtml", "?"));
        let err = f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap_err();
        assert!(matches!(err, AnnotationError::Resolution { .. }));
        assert!(f.highlighter.drawn().is_empty());
    }

    #[tokio::test]
    async fn test_incremental_draws_only_changes() {
        let f = fixture(ReconcileStrategy::Incremental, seed());
        f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();
        assert_eq!(f.highlighter.clear_calls(), 1);

        f.store.delete_annotation("a").await.unwrap();
        f.store.save_annotation(&test_annotation("d", CH1)).await.unwrap();

        let outcome = f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.retained, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(f.highlighter.destroyed(), vec!["h-a"]);
        assert_eq!(f.highlighter.clear_calls(), 1);
        assert_eq!(f.highlighter.drawn_ids(), vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_incremental_clears_on_chapter_change() {
        let f = fixture(ReconcileStrategy::Incremental, seed());
        f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();

        f.navigator.set_chapter(Link::new("ch2.xhtml", "Two"));
        let outcome = f.pipeline.reconcile(Some(&f.highlighter)).await.unwrap();
        assert_eq!(outcome.report().unwrap().removed, 2);
        assert_eq!(f.highlighter.clear_calls(), 2);
        assert_eq!(f.highlighter.drawn_ids(), vec!["b"]);
    }

    #[test]
    fn test_strategy_serde() {
        assert_eq!(
            serde_json::to_string(&ReconcileStrategy::Incremental).unwrap(),
            "\"incremental\""
        );
        assert_eq!(ReconcileStrategy::default(), ReconcileStrategy::Full);
    }
}
