use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::foundation::error::{ReelError, ReelResult};

/// Loads one model instance for a key.
#[async_trait::async_trait]
pub trait ModelLoader<K, M: ?Sized>: Send + Sync {
    /// Load the model for `key`. Called at most once per key per registry.
    async fn load(&self, key: &K) -> ReelResult<Arc<M>>;
}

/// Process-wide cache of read-only models keyed by `K`.
///
/// `get` is load-if-absent. Each key has its own slot: concurrent first requests for one model
/// wait for a single load, while requests for other keys proceed. Failed loads leave the slot
/// empty and are retried on the next `get`.
pub struct ModelRegistry<K, M: ?Sized> {
    loader: Arc<dyn ModelLoader<K, M>>,
    slots: Mutex<HashMap<K, Arc<OnceCell<Arc<M>>>>>,
}

impl<K, M> ModelRegistry<K, M>
where
    K: Clone + Eq + Hash + Send + Sync + std::fmt::Debug,
    M: ?Sized + Send + Sync,
{
    /// Create an empty registry backed by `loader`.
    pub fn new(loader: Arc<dyn ModelLoader<K, M>>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the model for `key`, loading it on first use.
    pub async fn get(&self, key: &K) -> ReelResult<Arc<M>> {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let model = slot
            .get_or_try_init(|| async {
                tracing::info!(?key, "loading model");
                let model = self.loader.load(key).await?;
                tracing::info!(?key, "model loaded");
                Ok::<_, ReelError>(model)
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Eagerly load every key, e.g. at process start.
    pub async fn preload(&self, keys: impl IntoIterator<Item = K>) -> ReelResult<()> {
        for key in keys {
            self.get(&key).await?;
        }
        Ok(())
    }

    /// Keys that currently have a loaded model.
    pub async fn loaded(&self) -> Vec<K> {
        self.slots
            .lock()
            .await
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/registry.rs"]
mod tests;
