use crate::config::{AppConfig, ModelEntry, ModelSourceConfig};
use async_trait::async_trait;
use headline_classifiers::{
    aggregate, CacheKey, FetchOutcome, ModelCache, ObjectStore, TextCategorizer,
};
use headline_core::{Error, ErrorKind, PredictionRow, Result, ResultsTable};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AppConfig>,

    /// Models loaded so far; lives as long as the process
    pub cache: Arc<ModelCache>,

    /// Store remote model archives are fetched from
    pub store: Arc<dyn ObjectStore>,
}

/// Per-model status reported by `/api/models`
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub name: String,
    pub source: String,
    /// Unpacked model found on local disk
    pub present: bool,
    /// Model loaded in this process
    pub cached: bool,
}

/// Outcome of loading one model
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub name: String,
    #[serde(flatten)]
    pub status: LoadStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    Loaded { backend: String, labels: Vec<String> },
    Failed { kind: ErrorKind, message: String },
}

impl AppState {
    /// Create state from configuration, building the object store
    pub async fn new(config: AppConfig) -> Self {
        let store: Arc<dyn ObjectStore> = match config.build_store().await {
            Some(store) => store,
            None => Arc::new(UnavailableStore::new("no remote models configured")),
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(ModelCache::new()),
            store,
        }
    }

    fn bucket(&self) -> &str {
        self.config.bucket().unwrap_or_default()
    }

    /// Cache key a configured model is stored under
    pub fn cache_key(&self, entry: &ModelEntry) -> CacheKey {
        match &entry.source {
            ModelSourceConfig::Remote { key } => CacheKey::remote(&entry.name, self.bucket(), key),
            ModelSourceConfig::Local { path } => CacheKey::local(&entry.name, path),
        }
    }

    /// Load one configured model, reusing the cached handle if present
    pub async fn load_model(&self, entry: &ModelEntry) -> Result<Arc<dyn TextCategorizer>> {
        let helper = entry.helper();
        match &entry.source {
            ModelSourceConfig::Remote { key } => {
                helper
                    .load_from_remote(&self.cache, self.store.as_ref(), self.bucket(), key)
                    .await
            }
            ModelSourceConfig::Local { path } => helper.load_local(&self.cache, path).await,
        }
    }

    /// Load every configured model, in configuration order
    pub async fn load_all(&self) -> Vec<(String, Result<Arc<dyn TextCategorizer>>)> {
        let mut loaded = Vec::with_capacity(self.config.models.len());
        for entry in &self.config.models {
            let result = self.load_model(entry).await;
            if let Err(e) = &result {
                tracing::warn!(model = %entry.name, error = %e, "Failed to load model");
            }
            loaded.push((entry.name.clone(), result));
        }
        loaded
    }

    /// Load every model and report how it went
    pub async fn load_reports(&self) -> Vec<LoadReport> {
        self.load_all()
            .await
            .into_iter()
            .map(|(name, result)| LoadReport {
                name,
                status: match result {
                    Ok(model) => LoadStatus::Loaded {
                        backend: model.backend().to_string(),
                        labels: model.labels().to_vec(),
                    },
                    Err(e) => LoadStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    },
                },
            })
            .collect()
    }

    /// Classify a headline with every configured model
    ///
    /// One row per configured model in configuration order; models that
    /// failed to load get a failure row.
    pub async fn classify(&self, headline: &str) -> ResultsTable {
        let loaded = self.load_all().await;

        let ready: Vec<(Arc<dyn TextCategorizer>, String)> = loaded
            .iter()
            .filter_map(|(name, result)| {
                result
                    .as_ref()
                    .ok()
                    .map(|model| (Arc::clone(model), name.clone()))
            })
            .collect();
        let mut predicted = aggregate(headline, &ready).await.rows.into_iter();

        let mut table = ResultsTable::new(headline);
        for (name, result) in &loaded {
            match result {
                Ok(_) => {
                    if let Some(row) = predicted.next() {
                        table.push(row);
                    }
                }
                Err(e) => table.push(PredictionRow::failed(name.as_str(), e)),
            }
        }
        table
    }

    /// Make sure every model is available on local disk, without loading it
    pub async fn fetch_all(&self) -> Vec<(String, Result<FetchOutcome>)> {
        let mut outcomes = Vec::with_capacity(self.config.models.len());
        for entry in &self.config.models {
            let outcome = match &entry.source {
                ModelSourceConfig::Remote { key } => {
                    entry
                        .helper()
                        .ensure_present(self.store.as_ref(), self.bucket(), key)
                        .await
                }
                ModelSourceConfig::Local { path } => local_outcome(path),
            };
            outcomes.push((entry.name.clone(), outcome));
        }
        outcomes
    }

    /// Status of every configured model
    pub fn model_statuses(&self) -> Vec<ModelStatus> {
        self.config
            .models
            .iter()
            .map(|entry| {
                let key = self.cache_key(entry);
                let present = match &entry.source {
                    ModelSourceConfig::Remote { .. } => entry.helper().is_present(),
                    ModelSourceConfig::Local { path } => path.is_dir(),
                };
                ModelStatus {
                    name: entry.name.clone(),
                    cached: self.cache.contains(&key),
                    source: key.source,
                    present,
                }
            })
            .collect()
    }
}

fn local_outcome(path: &Path) -> Result<FetchOutcome> {
    if path.is_dir() {
        Ok(FetchOutcome::Reused {
            path: path.to_path_buf(),
        })
    } else {
        Err(Error::model_load(format!(
            "Model directory does not exist: {}",
            path.display()
        )))
    }
}

/// Stand-in store used when no real one could be built
struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for UnavailableStore {
    async fn fetch(&self, _bucket: &str, _key: &str, _dest: &Path) -> Result<u64> {
        Err(Error::config(format!(
            "remote model storage unavailable: {}",
            self.reason
        )))
    }

    fn describe(&self) -> String {
        "unavailable".to_string()
    }
}
