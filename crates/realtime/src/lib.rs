//! Realtime store client for Rust
//!
//! A path-addressed, push-based key-value tree: point reads, full and
//! partial writes, and scoped child-event listeners. Two stores are
//! provided, [`FirebaseClient`] for a hosted Firebase Realtime Database and
//! [`MemoryStore`] for in-process use.

mod client;
mod error;
mod event;
mod fetch;
mod memory;
mod path;
mod sse;
mod store;
mod subscription;
mod tree;

pub use client::{FirebaseClient, StreamOptions};
pub use error::{RealtimeError, Result};
pub use event::{diff_children, ChildEvent, ChildEventKind, StreamMessage};
pub use memory::MemoryStore;
pub use path::DbPath;
pub use store::RealtimeStore;
pub use subscription::{ListenOptions, Subscription};
