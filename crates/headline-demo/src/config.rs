//! Application configuration

use headline_classifiers::{LocalObjectStore, ModelHelper, ObjectStore, S3ObjectStore, S3Settings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "headline.yaml";

/// Environment variable overriding `storage.bucket`
pub const BUCKET_ENV: &str = "HEADLINE_S3_BUCKET";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Headline the UI text field starts with
    #[serde(default = "default_headline")]
    pub default_headline: String,

    /// Where remote model archives live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Models to run, in display order
    #[serde(default = "default_models")]
    pub models: Vec<ModelEntry>,
}

/// Remote storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding the model archives
    #[serde(default)]
    pub bucket: Option<String>,

    /// AWS region (falls back to `AWS_REGION`)
    #[serde(default)]
    pub region: Option<String>,

    /// S3-compatible endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Send unsigned requests
    #[serde(default)]
    pub anonymous: bool,

    /// Serve buckets from a local directory instead of S3
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

/// One configured model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Display name, also the default cache directory name
    pub name: String,

    pub source: ModelSourceConfig,

    /// Directory holding the archive and unpacked model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
}

/// Where a model comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSourceConfig {
    /// Archive in the configured bucket
    Remote { key: String },
    /// Already unpacked directory on local disk
    Local { path: PathBuf },
}

impl ModelEntry {
    pub fn remote(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ModelSourceConfig::Remote { key: key.into() },
            base_path: None,
            archive_name: None,
            model_dir: None,
        }
    }

    pub fn local(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: ModelSourceConfig::Local { path: path.into() },
            base_path: None,
            archive_name: None,
            model_dir: None,
        }
    }

    /// Model helper with this entry's layout overrides applied
    pub fn helper(&self) -> ModelHelper {
        let mut helper = ModelHelper::new(&self.name);
        if let Some(base_path) = &self.base_path {
            helper = helper.with_base_path(base_path);
        }
        if let Some(archive_name) = &self.archive_name {
            helper = helper.with_archive_name(archive_name);
        }
        if let Some(model_dir) = &self.model_dir {
            helper = helper.with_model_dir(model_dir);
        }
        helper
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.source, ModelSourceConfig::Remote { .. })
    }
}

impl AppConfig {
    /// Load configuration from file, falling back to defaults if it is absent
    ///
    /// `HEADLINE_S3_BUCKET` overrides the configured bucket.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_yaml(&content)?
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
            Self::default()
        };

        if let Ok(bucket) = std::env::var(BUCKET_ENV) {
            if !bucket.is_empty() {
                config.storage.bucket = Some(bucket);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reject configurations no run could succeed with
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.models {
            if entry.name.trim().is_empty() {
                anyhow::bail!("model entries must have a name");
            }
            if !seen.insert(entry.name.as_str()) {
                anyhow::bail!("duplicate model name '{}'", entry.name);
            }
            if let ModelSourceConfig::Remote { key } = &entry.source {
                if key.trim().is_empty() {
                    anyhow::bail!("model '{}' has an empty object key", entry.name);
                }
            }
        }
        Ok(())
    }

    /// Configured bucket, ignoring empty values
    pub fn bucket(&self) -> Option<&str> {
        self.storage.bucket.as_deref().filter(|b| !b.is_empty())
    }

    /// Check if any model is fetched from remote storage
    pub fn has_remote_models(&self) -> bool {
        self.models.iter().any(ModelEntry::is_remote)
    }

    /// Build the object store remote models are fetched from
    ///
    /// Returns `None` when no model needs one.
    pub async fn build_store(&self) -> Option<Arc<dyn ObjectStore>> {
        if !self.has_remote_models() {
            return None;
        }

        if let Some(root) = &self.storage.local_root {
            tracing::info!(root = %root.display(), "Using local object store");
            return Some(Arc::new(LocalObjectStore::new(root)));
        }

        let settings = S3Settings {
            region: self.storage.region.clone(),
            endpoint: self.storage.endpoint.clone(),
            anonymous: self.storage.anonymous,
        };
        let store = S3ObjectStore::load(settings).await;
        tracing::info!(store = %store.describe(), "Using S3 object store");

        Some(Arc::new(store))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_headline: default_headline(),
            storage: StorageConfig::default(),
            models: default_models(),
        }
    }
}

fn default_headline() -> String {
    "Men Walk on Moon".to_string()
}

fn default_models() -> Vec<ModelEntry> {
    vec![
        ModelEntry::remote("spacy_base", "models/spacy_base/model-best.zip"),
        ModelEntry::remote("distilbert", "models/distilbert/model-best.zip"),
    ]
}
