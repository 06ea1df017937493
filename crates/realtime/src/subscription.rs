use crate::event::{ChildEvent, ChildEventKind};
use crate::path::DbPath;
use log::debug;
use tokio::sync::mpsc;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Builder for a listener on one location, mirroring how channels collect
/// their event kinds before subscribing.
#[derive(Debug, Clone)]
pub struct ListenOptions {
    path: DbPath,
    kinds: Vec<ChildEventKind>,
}

impl ListenOptions {
    pub fn new(path: DbPath) -> Self {
        Self {
            path,
            kinds: Vec::new(),
        }
    }

    /// Add an event kind to listen for.
    pub fn event(mut self, kind: ChildEventKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    /// Event kinds requested, defaulting to added and changed.
    pub fn kinds(&self) -> Vec<ChildEventKind> {
        if self.kinds.is_empty() {
            ChildEventKind::UPSERTS.to_vec()
        } else {
            self.kinds.clone()
        }
    }

    pub fn wants(&self, kind: ChildEventKind) -> bool {
        self.kinds().contains(&kind)
    }
}

/// An active listener. Events arrive in commit order; the listener is
/// released exactly once, either through [`Subscription::unsubscribe`] or
/// when the handle is dropped.
pub struct Subscription {
    id: String,
    path: DbPath,
    events: mpsc::UnboundedReceiver<ChildEvent>,
    release: Option<ReleaseFn>,
}

impl Subscription {
    /// Wrap a channel of events; `release` runs when the listener is
    /// released.
    pub fn new<F>(path: DbPath, events: mpsc::UnboundedReceiver<ChildEvent>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            path,
            events,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    /// Not yet released, and the source has not shut down.
    pub fn is_active(&self) -> bool {
        self.release.is_some() && !self.events.is_closed()
    }

    /// Wait for the next event. `None` once the listener is released or the
    /// source has closed.
    pub async fn next_event(&mut self) -> Option<ChildEvent> {
        if self.release.is_none() {
            return None;
        }
        self.events.recv().await
    }

    /// Take an already delivered event without waiting.
    pub fn try_next_event(&mut self) -> Option<ChildEvent> {
        if self.release.is_none() {
            return None;
        }
        self.events.try_recv().ok()
    }

    /// Release the listener now.
    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            debug!("Releasing subscription {} on '{}'", self.id, self.path);
            self.events.close();
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("active", &self.is_active())
            .finish()
    }
}
