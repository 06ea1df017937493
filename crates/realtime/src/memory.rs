//! In-process realtime store with the same child event semantics as the
//! hosted database: listening replays existing children as `Added`, and every
//! write notifies the listeners whose children it touched.

use crate::error::{RealtimeError, Result};
use crate::event::{diff_children, ChildEvent};
use crate::path::DbPath;
use crate::store::RealtimeStore;
use crate::subscription::{ListenOptions, Subscription};
use crate::tree;
use async_trait::async_trait;
use log::{debug, trace};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

struct Listener {
    options: ListenOptions,
    sender: mpsc::UnboundedSender<ChildEvent>,
}

#[derive(Default)]
struct MemoryState {
    root: Value,
    listeners: HashMap<u64, Listener>,
}

/// Shared in-memory tree. Clones share the same data and listeners.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    next_listener: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing tree.
    pub fn with_data(root: Value) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.root = root;
        }
        store
    }

    /// Copy of the whole tree.
    pub fn snapshot(&self) -> Result<Value> {
        Ok(self.lock()?.root.clone())
    }

    /// Number of listeners not yet released.
    pub fn listener_count(&self) -> usize {
        self.lock().map(|state| state.listeners.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| RealtimeError::store("memory store lock poisoned"))
    }

    /// Apply `writes` atomically and notify listeners of the resulting child
    /// changes.
    fn apply(&self, writes: Vec<(DbPath, Value)>) -> Result<()> {
        let mut state = self.lock()?;

        let before: Vec<(u64, Map<String, Value>)> = state
            .listeners
            .iter()
            .map(|(id, l)| (*id, tree::children_at(&state.root, l.options.path().segments())))
            .collect();

        for (path, value) in writes {
            trace!("memory store write at '{}'", path);
            tree::write_at(&mut state.root, path.segments(), value);
        }

        let mut closed = Vec::new();
        for (id, previous) in before {
            let Some(listener) = state.listeners.get(&id) else {
                continue;
            };
            let current = tree::children_at(&state.root, listener.options.path().segments());
            for event in diff_children(&previous, &current) {
                if !listener.options.wants(event.kind) {
                    continue;
                }
                if listener.sender.send(event).is_err() {
                    closed.push(id);
                    break;
                }
            }
        }
        for id in closed {
            state.listeners.remove(&id);
        }
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &DbPath) -> Result<Option<Value>> {
        let state = self.lock()?;
        Ok(tree::read_at(&state.root, path.segments()).cloned())
    }

    async fn set(&self, path: &DbPath, value: &Value) -> Result<()> {
        self.apply(vec![(path.clone(), value.clone())])
    }

    async fn update(&self, path: &DbPath, fields: &Map<String, Value>) -> Result<()> {
        let mut writes = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let relative = DbPath::parse(key)?;
            writes.push((path.join(&relative), value.clone()));
        }
        self.apply(writes)
    }

    async fn listen(&self, options: ListenOptions) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        let path = options.path().clone();

        {
            let mut state = self.lock()?;
            let existing = tree::children_at(&state.root, path.segments());
            for event in diff_children(&Map::new(), &existing) {
                if options.wants(event.kind) {
                    // The receiver is still in scope, so this cannot fail.
                    let _ = sender.send(event);
                }
            }
            state.listeners.insert(id, Listener { options, sender });
        }
        debug!("memory store listener {} registered on '{}'", id, path);

        let state = Arc::downgrade(&self.state);
        Ok(Subscription::new(path, receiver, move || {
            if let Some(state) = state.upgrade() {
                if let Ok(mut state) = state.lock() {
                    state.listeners.remove(&id);
                }
            }
        }))
    }
}
