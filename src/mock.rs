//! Mock collaborators for testing.
//!
//! Each mock records the calls it receives and returns pre-configured
//! responses. Configured errors are one-shot: they fire on the next matching
//! call and are then cleared.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::annotations::{
    Annotation, AnnotationMarker, AnnotationText, HighlightPayload, Locations,
};
use crate::highlighter::{Highlighter, RenderError, RenderRequest, ViewportWindow};
use crate::navigator::Navigator;
use crate::publication::{Link, Locator};
use crate::remote::{RemoteAnnotationApi, RemoteCapabilities, RemoteError, RemoteResult};
use crate::store::{AnnotationStore, StoreResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A highlight drawn by [`MockHighlighter`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnHighlight {
    pub annotation_id: String,
    pub highlight_id: String,
    pub color: String,
    pub marker: AnnotationMarker,
}

struct HighlighterState {
    ready: bool,
    scroll_height: f64,
    inner_height: f64,
    color: String,
    drawn: Vec<DrawnHighlight>,
    failing: HashSet<String>,
    offsets: HashMap<String, f64>,
    destroyed: Vec<String>,
    clear_calls: usize,
    refresh_calls: usize,
    scrolls: Vec<f64>,
}

/// Mock implementation of `Highlighter` that doubles as its own window.
pub struct MockHighlighter {
    state: Mutex<HighlighterState>,
}

impl Default for MockHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHighlighter {
    /// A ready 1000px document in a 900px window, capturing in yellow.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HighlighterState {
                ready: true,
                scroll_height: 1000.0,
                inner_height: 900.0,
                color: "#ffff00".to_string(),
                drawn: Vec::new(),
                failing: HashSet::new(),
                offsets: HashMap::new(),
                destroyed: Vec::new(),
                clear_calls: 0,
                refresh_calls: 0,
                scrolls: Vec::new(),
            }),
        }
    }

    pub fn with_scroll_height(self, height: f64) -> Self {
        lock(&self.state).scroll_height = height;
        self
    }

    pub fn with_color(self, color: &str) -> Self {
        lock(&self.state).color = color.to_string();
        self
    }

    /// Report a top offset for a drawn highlight.
    pub fn with_offset(self, highlight_id: &str, offset: f64) -> Self {
        lock(&self.state)
            .offsets
            .insert(highlight_id.to_string(), offset);
        self
    }

    /// Make drawing the given highlight fail with `RangeNotFound`.
    pub fn with_failing_highlight(self, highlight_id: &str) -> Self {
        lock(&self.state).failing.insert(highlight_id.to_string());
        self
    }

    pub fn set_ready(&self, ready: bool) {
        lock(&self.state).ready = ready;
    }

    /// Highlights currently drawn, in drawing order.
    pub fn drawn(&self) -> Vec<DrawnHighlight> {
        lock(&self.state).drawn.clone()
    }

    /// Annotation ids currently drawn, in drawing order.
    pub fn drawn_ids(&self) -> Vec<String> {
        lock(&self.state)
            .drawn
            .iter()
            .map(|h| h.annotation_id.clone())
            .collect()
    }

    /// Highlight ids removed one by one.
    pub fn destroyed(&self) -> Vec<String> {
        lock(&self.state).destroyed.clone()
    }

    pub fn clear_calls(&self) -> usize {
        lock(&self.state).clear_calls
    }

    pub fn refresh_calls(&self) -> usize {
        lock(&self.state).refresh_calls
    }

    pub fn scrolls(&self) -> Vec<f64> {
        lock(&self.state).scrolls.clone()
    }
}

impl ViewportWindow for MockHighlighter {
    fn highlight_offset(&self, highlight_id: &str) -> Option<f64> {
        lock(&self.state).offsets.get(highlight_id).copied()
    }

    fn inner_height(&self) -> f64 {
        lock(&self.state).inner_height
    }

    fn scroll_to(&self, y: f64) {
        lock(&self.state).scrolls.push(y);
    }
}

impl Highlighter for MockHighlighter {
    fn is_document_ready(&self) -> bool {
        lock(&self.state).ready
    }

    fn document_scroll_height(&self) -> f64 {
        lock(&self.state).scroll_height
    }

    fn color(&self) -> String {
        lock(&self.state).color.clone()
    }

    fn set_color(&self, color: &str) {
        lock(&self.state).color = color.to_string();
    }

    fn create_highlight_dom(&self, request: &RenderRequest<'_>) -> Result<(), RenderError> {
        let mut state = lock(&self.state);
        if state.failing.contains(&request.payload.id) {
            return Err(RenderError::RangeNotFound {
                highlight_id: request.payload.id.clone(),
            });
        }
        state.drawn.push(DrawnHighlight {
            annotation_id: request.annotation_id.to_string(),
            highlight_id: request.payload.id.clone(),
            color: request.color.to_string(),
            marker: request.marker,
        });
        Ok(())
    }

    fn destroy_highlight(&self, highlight_id: &str) {
        let mut state = lock(&self.state);
        state.drawn.retain(|h| h.highlight_id != highlight_id);
        state.destroyed.push(highlight_id.to_string());
    }

    fn destroy_all_highlights(&self) {
        let mut state = lock(&self.state);
        state.drawn.clear();
        state.clear_calls += 1;
    }

    fn refresh_layout(&self) {
        lock(&self.state).refresh_calls += 1;
    }

    fn window(&self) -> &dyn ViewportWindow {
        self
    }
}

struct NavigatorState {
    chapter: Link,
    toc_url: Option<String>,
    position: f64,
    navigations: Vec<Locator>,
}

/// Mock implementation of `Navigator`.
pub struct MockNavigator {
    state: Mutex<NavigatorState>,
}

impl MockNavigator {
    /// Navigator displaying the given chapter at its start.
    pub fn at(chapter: Link) -> Self {
        Self {
            state: Mutex::new(NavigatorState {
                chapter,
                toc_url: None,
                position: 0.0,
                navigations: Vec::new(),
            }),
        }
    }

    pub fn set_chapter(&self, chapter: Link) {
        let mut state = lock(&self.state);
        state.chapter = chapter;
        state.toc_url = None;
    }

    pub fn set_toc_url(&self, toc_url: Option<String>) {
        lock(&self.state).toc_url = toc_url;
    }

    pub fn set_position(&self, position: f64) {
        lock(&self.state).position = position;
    }

    /// Locators passed to `navigate`, in call order.
    pub fn navigations(&self) -> Vec<Locator> {
        lock(&self.state).navigations.clone()
    }
}

impl Navigator for MockNavigator {
    fn current_chapter_link(&self) -> Link {
        lock(&self.state).chapter.clone()
    }

    fn current_toc_url(&self) -> Option<String> {
        lock(&self.state).toc_url.clone()
    }

    fn current_position(&self) -> f64 {
        lock(&self.state).position
    }

    fn navigate(&self, locator: &Locator) {
        lock(&self.state).navigations.push(locator.clone());
    }
}

/// A recorded call to the mock remote.
#[derive(Debug, Clone)]
pub enum RemoteCall {
    Add(Annotation),
    Delete(String),
}

/// Mock implementation of `RemoteAnnotationApi`.
pub struct MockRemoteApi {
    capabilities: RemoteCapabilities,
    assigned_ids: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RemoteCall>>,
    add_error: Mutex<Option<RemoteError>>,
    delete_error: Mutex<Option<RemoteError>>,
}

impl Default for MockRemoteApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemoteApi {
    pub fn new() -> Self {
        Self {
            capabilities: RemoteCapabilities::ALL,
            assigned_ids: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            add_error: Mutex::new(None),
            delete_error: Mutex::new(None),
        }
    }

    pub fn with_capabilities(mut self, capabilities: RemoteCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Ids handed out by successive adds; once exhausted, ids are `remote-<n>`.
    pub fn with_assigned_ids(self, ids: &[&str]) -> Self {
        lock(&self.assigned_ids).extend(ids.iter().map(|id| id.to_string()));
        self
    }

    /// Fail the next add with the given error.
    pub fn fail_next_add(&self, err: RemoteError) {
        *lock(&self.add_error) = Some(err);
    }

    /// Fail the next delete with the given error.
    pub fn fail_next_delete(&self, err: RemoteError) {
        *lock(&self.delete_error) = Some(err);
    }

    /// Return all recorded calls.
    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, call: RemoteCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl RemoteAnnotationApi for MockRemoteApi {
    fn capabilities(&self) -> RemoteCapabilities {
        self.capabilities
    }

    async fn add_annotation(&self, annotation: &Annotation) -> RemoteResult<Annotation> {
        self.record(RemoteCall::Add(annotation.clone()));
        if let Some(err) = lock(&self.add_error).take() {
            return Err(err);
        }
        let id = lock(&self.assigned_ids)
            .pop_front()
            .unwrap_or_else(|| format!("remote-{}", self.call_count()));
        let mut confirmed = annotation.clone();
        confirmed.id = id;
        Ok(confirmed)
    }

    async fn delete_annotation(&self, annotation: &Annotation) -> RemoteResult<()> {
        self.record(RemoteCall::Delete(annotation.id.clone()));
        match lock(&self.delete_error).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Store wrapper that parks the next `get_annotations` call once armed.
///
/// Lets a test start a second reconcile pass while the first one is still
/// loading records.
pub struct GatedStore {
    inner: Arc<dyn AnnotationStore>,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    pub fn new(inner: Arc<dyn AnnotationStore>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Park the next read until [`GatedStore::release`].
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until a read is parked at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked read continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl AnnotationStore for GatedStore {
    async fn get_annotations(&self) -> StoreResult<Vec<Annotation>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.get_annotations().await
    }

    async fn save_annotation(&self, annotation: &Annotation) -> StoreResult<Annotation> {
        self.inner.save_annotation(annotation).await
    }

    async fn delete_annotation(&self, id: &str) -> StoreResult<Option<Annotation>> {
        self.inner.delete_annotation(id).await
    }

    async fn init_annotations(&self, seed: Vec<Annotation>) -> StoreResult<usize> {
        self.inner.init_annotations(seed).await
    }
}

/// Helper to create a test annotation with sensible defaults.
pub fn test_annotation(id: &str, href: &str) -> Annotation {
    Annotation {
        id: id.to_string(),
        href: href.to_string(),
        locations: Locations { progression: 0.5 },
        created: Utc::now(),
        media_type: Some("application/xhtml+xml".to_string()),
        title: None,
        highlight: HighlightPayload::new(format!("h-{id}"), format!("text of {id}")),
        color: "#ff0000".to_string(),
        marker: AnnotationMarker::Highlight,
        text: AnnotationText {
            highlight: format!("text of {id}"),
        },
    }
}
