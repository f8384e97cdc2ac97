//! In-process window topology.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::{ChildKind, ChildSurface, MessageEndpoint, Surface, SurfaceEnumerator};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Error type for window set operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("Window already open: {0}")]
    AlreadyOpen(String),

    #[error("Window not found: {0}")]
    WindowNotFound(String),

    #[error("View already attached: {window}/{view}")]
    ViewAlreadyAttached { window: String, view: String },

    #[error("View not found: {window}/{view}")]
    ViewNotFound { window: String, view: String },
}

/// A view embedded in a window.
pub struct EmbeddedView {
    label: String,
    kind: ChildKind,
    destroyed: AtomicBool,
    endpoint: RwLock<Option<Arc<dyn MessageEndpoint>>>,
}

impl EmbeddedView {
    pub fn new(
        label: impl Into<String>,
        kind: ChildKind,
        endpoint: Option<Arc<dyn MessageEndpoint>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            kind,
            destroyed: AtomicBool::new(false),
            endpoint: RwLock::new(endpoint),
        })
    }

    /// Mark destroyed and release the endpoint.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        write(&self.endpoint).take();
    }
}

impl ChildSurface for EmbeddedView {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> ChildKind {
        self.kind
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn endpoint(&self) -> Option<Arc<dyn MessageEndpoint>> {
        read(&self.endpoint).clone()
    }
}

/// A top-level window and its embedded views.
pub struct Window {
    id: Uuid,
    label: String,
    destroyed: AtomicBool,
    endpoint: RwLock<Option<Arc<dyn MessageEndpoint>>>,
    views: RwLock<Vec<Arc<EmbeddedView>>>,
}

impl Window {
    pub fn new(label: impl Into<String>, endpoint: Option<Arc<dyn MessageEndpoint>>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            label: label.into(),
            destroyed: AtomicBool::new(false),
            endpoint: RwLock::new(endpoint),
            views: RwLock::new(Vec::new()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Append a view to the content area. Labels of live views must be unique.
    pub fn attach(&self, view: Arc<EmbeddedView>) -> Result<(), WindowError> {
        let mut views = write(&self.views);
        if views.iter().any(|v| !v.is_destroyed() && v.label == view.label) {
            return Err(WindowError::ViewAlreadyAttached {
                window: self.label.clone(),
                view: view.label.clone(),
            });
        }
        views.push(view);
        Ok(())
    }

    /// Find a live view by label.
    pub fn view(&self, label: &str) -> Option<Arc<EmbeddedView>> {
        read(&self.views)
            .iter()
            .find(|v| !v.is_destroyed() && v.label == label)
            .cloned()
    }

    /// Snapshot of the attached views.
    pub fn views(&self) -> Vec<Arc<EmbeddedView>> {
        read(&self.views).clone()
    }

    /// Destroy the window together with its views.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        write(&self.endpoint).take();
        for view in read(&self.views).iter() {
            view.destroy();
        }
    }
}

impl Surface for Window {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn endpoint(&self) -> Option<Arc<dyn MessageEndpoint>> {
        read(&self.endpoint).clone()
    }

    fn children(&self) -> Vec<Arc<dyn ChildSurface>> {
        read(&self.views)
            .iter()
            .map(|v| Arc::clone(v) as Arc<dyn ChildSurface>)
            .collect()
    }
}

/// The set of windows the application has opened.
///
/// Destroyed windows stay in the set until [`WindowSet::prune`] but are never
/// returned by [`SurfaceEnumerator::live_surfaces`].
#[derive(Default)]
pub struct WindowSet {
    windows: RwLock<Vec<Arc<Window>>>,
}

impl WindowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a window. Labels of live windows must be unique.
    pub fn open(&self, window: Arc<Window>) -> Result<(), WindowError> {
        let mut windows = write(&self.windows);
        if windows
            .iter()
            .any(|w| !w.is_destroyed() && w.label == window.label)
        {
            return Err(WindowError::AlreadyOpen(window.label.clone()));
        }
        debug!(window = %window.label, id = %window.id, "window opened");
        windows.push(window);
        Ok(())
    }

    /// Find a live window by label.
    pub fn get(&self, label: &str) -> Option<Arc<Window>> {
        read(&self.windows)
            .iter()
            .find(|w| !w.is_destroyed() && w.label == label)
            .cloned()
    }

    /// Destroy a live window.
    pub fn destroy(&self, label: &str) -> Result<(), WindowError> {
        let window = self
            .get(label)
            .ok_or_else(|| WindowError::WindowNotFound(label.to_string()))?;
        window.destroy();
        debug!(window = %label, "window destroyed");
        Ok(())
    }

    /// Destroy one view of a live window.
    pub fn destroy_view(&self, window: &str, view: &str) -> Result<(), WindowError> {
        let win = self
            .get(window)
            .ok_or_else(|| WindowError::WindowNotFound(window.to_string()))?;
        let v = win.view(view).ok_or_else(|| WindowError::ViewNotFound {
            window: window.to_string(),
            view: view.to_string(),
        })?;
        v.destroy();
        Ok(())
    }

    /// Remove destroyed windows. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut windows = write(&self.windows);
        let before = windows.len();
        windows.retain(|w| !w.is_destroyed());
        before - windows.len()
    }

    /// Snapshot of all windows, destroyed ones included.
    pub fn windows(&self) -> Vec<Arc<Window>> {
        read(&self.windows).clone()
    }

    pub fn len(&self) -> usize {
        read(&self.windows).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SurfaceEnumerator for WindowSet {
    fn live_surfaces(&self) -> Vec<Arc<dyn Surface>> {
        read(&self.windows)
            .iter()
            .filter(|w| !w.is_destroyed())
            .map(|w| Arc::clone(w) as Arc<dyn Surface>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the window topology.
    //!
    //! Coverage:
    //! - Window and view destruction
    //! - View label uniqueness and lookup of live views only
    //! - Live surface enumeration
    //! - Open/destroy/prune on the window set

    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::events::Channel;
    use crate::surface::outbox;

    // =========================================================================
    // Window Tests
    // =========================================================================

    #[test]
    fn test_window_destroy_releases_endpoint_and_views() {
        let (outbox, _rx) = outbox();
        let win = Window::new("main", Some(Arc::new(outbox.endpoint("main"))));
        let view = EmbeddedView::new(
            "tab-1",
            ChildKind::Web,
            Some(Arc::new(outbox.endpoint("tab-1"))),
        );
        win.attach(view.clone()).unwrap();

        win.destroy();

        assert!(win.is_destroyed());
        assert!(win.endpoint().is_none());
        assert!(view.is_destroyed());
        assert!(ChildSurface::endpoint(view.as_ref()).is_none());
    }

    #[test]
    fn test_children_preserve_attach_order() {
        let win = Window::new("main", None);
        win.attach(EmbeddedView::new("a", ChildKind::Web, None)).unwrap();
        win.attach(EmbeddedView::new("b", ChildKind::Native, None)).unwrap();
        win.attach(EmbeddedView::new("c", ChildKind::Web, None)).unwrap();

        let labels: Vec<String> = win
            .children()
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_eq!(win.view("b").unwrap().kind(), ChildKind::Native);
    }

    // =========================================================================
    // WindowSet Tests
    // =========================================================================

    #[test]
    fn test_live_surfaces_excludes_destroyed() {
        let set = WindowSet::new();
        for label in ["a", "b", "c", "d"] {
            set.open(Window::new(label, None)).unwrap();
        }

        set.destroy("c").unwrap();

        let labels: Vec<String> = set
            .live_surfaces()
            .iter()
            .map(|s| s.label().to_string())
            .collect();
        assert_eq!(labels, vec!["a", "b", "d"]);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_live_surfaces_is_recomputed_per_call() {
        let set = WindowSet::new();
        set.open(Window::new("a", None)).unwrap();
        assert_eq!(set.live_surfaces().len(), 1);

        set.open(Window::new("b", None)).unwrap();
        assert_eq!(set.live_surfaces().len(), 2);

        set.destroy("a").unwrap();
        assert_eq!(set.live_surfaces().len(), 1);
    }

    #[test]
    fn test_open_rejects_duplicate_live_label() {
        let set = WindowSet::new();
        set.open(Window::new("main", None)).unwrap();

        let err = set.open(Window::new("main", None)).unwrap_err();
        assert_eq!(err, WindowError::AlreadyOpen("main".into()));

        set.destroy("main").unwrap();
        assert!(set.open(Window::new("main", None)).is_ok());
    }

    #[test]
    fn test_destroy_unknown_window() {
        let set = WindowSet::new();
        assert_eq!(
            set.destroy("ghost"),
            Err(WindowError::WindowNotFound("ghost".into()))
        );
    }

    #[test]
    fn test_destroy_view() {
        let set = WindowSet::new();
        let win = Window::new("main", None);
        let tab = EmbeddedView::new("tab-1", ChildKind::Web, None);
        win.attach(tab.clone()).unwrap();
        set.open(win.clone()).unwrap();

        set.destroy_view("main", "tab-1").unwrap();
        assert!(tab.is_destroyed());
        assert!(win.view("tab-1").is_none());

        assert_eq!(
            set.destroy_view("main", "tab-9"),
            Err(WindowError::ViewNotFound {
                window: "main".into(),
                view: "tab-9".into()
            })
        );
    }

    #[test]
    fn test_attach_rejects_duplicate_live_view() {
        let win = Window::new("main", None);
        win.attach(EmbeddedView::new("tab", ChildKind::Web, None)).unwrap();

        assert_eq!(
            win.attach(EmbeddedView::new("tab", ChildKind::Native, None)),
            Err(WindowError::ViewAlreadyAttached {
                window: "main".into(),
                view: "tab".into()
            })
        );
        assert_eq!(win.views().len(), 1);
    }

    #[test]
    fn test_reattached_view_is_the_one_destroyed() {
        let (outbox, mut rx) = outbox();
        let set = Arc::new(WindowSet::new());
        let win = Window::new("main", Some(Arc::new(outbox.endpoint("main"))));
        set.open(win.clone()).unwrap();
        let tab = || {
            let endpoint: Arc<dyn MessageEndpoint> = Arc::new(outbox.endpoint("tab"));
            EmbeddedView::new("tab", ChildKind::Web, Some(endpoint))
        };

        win.attach(tab()).unwrap();
        set.destroy_view("main", "tab").unwrap();
        win.attach(tab()).unwrap();
        set.destroy_view("main", "tab").unwrap();

        assert!(win.views().iter().all(|v| v.is_destroyed()));
        assert_eq!(
            set.destroy_view("main", "tab"),
            Err(WindowError::ViewNotFound {
                window: "main".into(),
                view: "tab".into()
            })
        );

        Broadcaster::new(set).broadcast(&Channel::new("ui", "onMaximized"), &[]);
        let surfaces: Vec<String> = rx.drain().into_iter().map(|m| m.surface).collect();
        assert_eq!(surfaces, vec!["main"]);
    }

    #[test]
    fn test_prune_removes_destroyed() {
        let set = WindowSet::new();
        set.open(Window::new("a", None)).unwrap();
        set.open(Window::new("b", None)).unwrap();
        set.destroy("a").unwrap();

        assert_eq!(set.prune(), 1);
        assert_eq!(set.len(), 1);
        assert!(set.get("a").is_none());
        assert!(!set.is_empty());
    }
}
