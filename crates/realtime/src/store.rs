use crate::error::Result;
use crate::path::DbPath;
use crate::subscription::{ListenOptions, Subscription};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A push-based key-value tree addressed by slash separated paths.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Point read. `None` when nothing is stored at `path`.
    async fn get(&self, path: &DbPath) -> Result<Option<Value>>;

    /// Overwrite everything at `path` with `value`.
    async fn set(&self, path: &DbPath, value: &Value) -> Result<()>;

    /// Overwrite only the given children of `path`, leaving siblings intact.
    async fn update(&self, path: &DbPath, fields: &Map<String, Value>) -> Result<()>;

    /// Listen for child events below `options.path()`.
    async fn listen(&self, options: ListenOptions) -> Result<Subscription>;
}

#[async_trait]
impl<S: RealtimeStore + ?Sized> RealtimeStore for Arc<S> {
    async fn get(&self, path: &DbPath) -> Result<Option<Value>> {
        (**self).get(path).await
    }

    async fn set(&self, path: &DbPath, value: &Value) -> Result<()> {
        (**self).set(path, value).await
    }

    async fn update(&self, path: &DbPath, fields: &Map<String, Value>) -> Result<()> {
        (**self).update(path, fields).await
    }

    async fn listen(&self, options: ListenOptions) -> Result<Subscription> {
        (**self).listen(options).await
    }
}
