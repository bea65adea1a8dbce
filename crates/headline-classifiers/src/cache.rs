//! Process-wide model cache

use crate::categorizer::TextCategorizer;
use headline_core::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Identity of a cached model: display name plus where it was loaded from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub model_name: String,
    pub source: String,
}

impl CacheKey {
    pub fn new(model_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            source: source.into(),
        }
    }

    /// Key for a model fetched from remote storage
    pub fn remote(model_name: impl Into<String>, bucket: &str, key: &str) -> Self {
        Self::new(model_name, format!("s3://{}/{}", bucket, key))
    }

    /// Key for a model loaded from a local directory
    pub fn local(model_name: impl Into<String>, path: &std::path::Path) -> Self {
        Self::new(model_name, format!("file://{}", path.display()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model_name, self.source)
    }
}

type Slot = Arc<OnceCell<Arc<dyn TextCategorizer>>>;

/// Cache of loaded models, alive for the lifetime of its owner
///
/// Entries are only ever added. Concurrent first requests for one key share
/// a single load; a failed load leaves the key empty so the next request
/// tries again.
#[derive(Default)]
pub struct ModelCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached model for `key`, running `load` if it is absent
    pub async fn get_or_load<F, Fut>(&self, key: CacheKey, load: F) -> Result<Arc<dyn TextCategorizer>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn TextCategorizer>>>,
    {
        let slot = self.slots.lock().entry(key.clone()).or_default().clone();

        if let Some(model) = slot.get() {
            tracing::debug!(%key, "Model cache hit");
            metrics::counter!("headline_model_cache_hits_total").increment(1);
            return Ok(Arc::clone(model));
        }

        let model = slot.get_or_try_init(load).await?;
        Ok(Arc::clone(model))
    }

    /// Cached model for `key`, if loaded
    pub fn get(&self, key: &CacheKey) -> Option<Arc<dyn TextCategorizer>> {
        self.slots
            .lock()
            .get(key)
            .and_then(|slot| slot.get().cloned())
    }

    /// Check if a model is loaded for `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of loaded models
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of loaded models
    pub fn keys(&self) -> Vec<CacheKey> {
        self.slots
            .lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(key, _)| key.clone())
            .collect()
    }
}
