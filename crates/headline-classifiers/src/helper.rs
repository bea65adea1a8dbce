//! Model helper: fetch-or-reuse a model artifact and load it once per process
//!
//! A [`ModelHelper`] owns the local layout of one model:
//!
//! ```text
//! <base_path>/                 default: models/<model_name>
//!     <archive_name>           downloaded zip, removed after unpacking
//!     <model_dir>/             unpacked model, default: model-best
//! ```
//!
//! The unpacked directory only appears once it is complete: archives are
//! downloaded to a `.part` file and unpacked into a staging directory that
//! is renamed into place once every file its backend needs is there. Any
//! failure removes the partial download and the staging directory.

use crate::archive::unpack_zip;
use crate::cache::{CacheKey, ModelCache};
use crate::categorizer::TextCategorizer;
use crate::loader::{load_model_dir, validate_model_dir};
use crate::manifest::resolve_model_root;
use crate::storage::ObjectStore;
use headline_core::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default root under which each model gets its own directory
pub const DEFAULT_MODELS_ROOT: &str = "models";

/// Default file name of the downloaded archive
pub const DEFAULT_ARCHIVE_NAME: &str = "model-best.zip";

/// Default name of the unpacked model directory
pub const DEFAULT_MODEL_DIR: &str = "model-best";

/// What [`ModelHelper::ensure_present`] had to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The unpacked model was already on disk
    Reused { path: PathBuf },
    /// The archive was downloaded and unpacked
    Downloaded { path: PathBuf, bytes: u64 },
}

impl FetchOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Reused { path } | Self::Downloaded { path, .. } => path,
        }
    }
}

/// Per-model helper holding the local cache paths of one model
#[derive(Debug, Clone)]
pub struct ModelHelper {
    model_name: String,
    base_path: PathBuf,
    archive_name: String,
    model_dir: String,
}

impl ModelHelper {
    /// Helper with the default layout under `models/<model_name>`
    pub fn new(model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        let base_path = Path::new(DEFAULT_MODELS_ROOT).join(&model_name);
        Self {
            model_name,
            base_path,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            model_dir: DEFAULT_MODEL_DIR.to_string(),
        }
    }

    /// Set the directory holding the archive and unpacked model
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the file name the archive is downloaded to
    pub fn with_archive_name(mut self, archive_name: impl Into<String>) -> Self {
        self.archive_name = archive_name.into();
        self
    }

    /// Set the name of the unpacked model directory
    pub fn with_model_dir(mut self, model_dir: impl Into<String>) -> Self {
        self.model_dir = model_dir.into();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn archive_path(&self) -> PathBuf {
        self.base_path.join(&self.archive_name)
    }

    /// Where the unpacked model lives
    pub fn model_path(&self) -> PathBuf {
        self.base_path.join(&self.model_dir)
    }

    /// Check if the unpacked model directory exists
    pub fn is_present(&self) -> bool {
        self.model_path().is_dir()
    }

    /// Busy message shown while the model is loading
    pub fn loading_message(&self) -> String {
        format!(
            "Loading NLP ({}) models... (note this could take a few min as models can be large)",
            self.model_name
        )
    }

    /// Make sure the unpacked model exists locally
    ///
    /// Reuses an existing model directory without touching `store`;
    /// otherwise downloads `bucket`/`key` and unpacks it into place.
    pub async fn ensure_present(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
    ) -> Result<FetchOutcome> {
        let model_path = self.model_path();
        if self.is_present() {
            debug!(model = %self.model_name, path = %model_path.display(), "Reusing local model");
            return Ok(FetchOutcome::Reused { path: model_path });
        }

        if bucket.is_empty() {
            return Err(Error::config(format!(
                "No bucket configured for model '{}'",
                self.model_name
            )));
        }
        if key.is_empty() {
            return Err(Error::config(format!(
                "No object key configured for model '{}'",
                self.model_name
            )));
        }

        tokio::fs::create_dir_all(&self.base_path).await?;

        let unique = uuid::Uuid::new_v4().simple().to_string();
        let part_path = self
            .base_path
            .join(format!("{}.{}.part", self.archive_name, unique));
        let archive_path = self.archive_path();
        let install = Install {
            model_name: self.model_name.clone(),
            archive_path: archive_path.clone(),
            staging_path: self
                .base_path
                .join(format!(".{}.staging-{}", self.model_dir, unique)),
            model_path: model_path.clone(),
        };

        info!(
            model = %self.model_name,
            source = %format!("s3://{}/{}", bucket, key),
            store = %store.describe(),
            "Downloading model archive"
        );
        let guard = DownloadGuard::new(vec![part_path.clone(), archive_path.clone()]);
        let downloaded = async {
            let bytes = store.fetch(bucket, key, &part_path).await?;
            tokio::fs::rename(&part_path, &archive_path).await?;
            Ok::<_, Error>(bytes)
        }
        .await;
        let bytes = match downloaded {
            Ok(bytes) => bytes,
            Err(e) => {
                guard.clean().await;
                return Err(e);
            }
        };
        metrics::counter!("headline_model_downloads_total").increment(1);

        info!(
            model = %self.model_name,
            bytes,
            archive = %archive_path.display(),
            "Unpacking model archive"
        );
        // From here the blocking install owns the archive and cleans up after
        // itself, even if this future is dropped before it finishes.
        guard.disarm();
        tokio::task::spawn_blocking(move || install.run())
            .await
            .map_err(|e| Error::internal(format!("Unpack task failed: {}", e)))??;

        info!(model = %self.model_name, path = %model_path.display(), "Model ready");
        Ok(FetchOutcome::Downloaded {
            path: model_path,
            bytes,
        })
    }

    /// Fetch-or-reuse the remote model and load it, once per process
    pub async fn load_from_remote(
        &self,
        cache: &ModelCache,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
    ) -> Result<Arc<dyn TextCategorizer>> {
        let cache_key = CacheKey::remote(&self.model_name, bucket, key);
        cache
            .get_or_load(cache_key, || async {
                info!("{}", self.loading_message());
                let outcome = self.ensure_present(store, bucket, key).await?;
                load_blocking(outcome.path().to_path_buf(), self.model_name.clone()).await
            })
            .await
    }

    /// Load a model from a local directory, once per process
    pub async fn load_local(
        &self,
        cache: &ModelCache,
        path: &Path,
    ) -> Result<Arc<dyn TextCategorizer>> {
        let cache_key = CacheKey::local(&self.model_name, path);
        cache
            .get_or_load(cache_key, || async {
                info!("{}", self.loading_message());
                load_blocking(path.to_path_buf(), self.model_name.clone()).await
            })
            .await
    }
}

async fn load_blocking(path: PathBuf, name: String) -> Result<Arc<dyn TextCategorizer>> {
    tokio::task::spawn_blocking(move || load_model_dir(&path, &name))
        .await
        .map_err(|e| Error::internal(format!("Model load task failed: {}", e)))?
}

/// Unpack, validate and move a downloaded archive into place
///
/// Runs on the blocking pool. The archive and staging directory are gone
/// when `run` returns, whatever the outcome.
struct Install {
    model_name: String,
    archive_path: PathBuf,
    staging_path: PathBuf,
    model_path: PathBuf,
}

impl Install {
    fn run(self) -> Result<()> {
        let result = self.unpack_into_place();
        remove_paths(&[self.staging_path, self.archive_path]);
        result
    }

    fn unpack_into_place(&self) -> Result<()> {
        unpack_zip(&self.archive_path, &self.staging_path)?;
        let root = resolve_model_root(&self.staging_path)?;
        validate_model_dir(&root)?;

        match std::fs::rename(&root, &self.model_path) {
            Ok(()) => Ok(()),
            Err(_) if self.model_path.is_dir() => {
                warn!(
                    model = %self.model_name,
                    "Model directory appeared while unpacking, keeping existing copy"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Removes partial download files if the download is abandoned
///
/// Dropping an armed guard hands the removal to the blocking pool.
struct DownloadGuard {
    paths: Vec<PathBuf>,
}

impl DownloadGuard {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Remove the files now and wait for it
    async fn clean(mut self) {
        let paths = std::mem::take(&mut self.paths);
        if let Err(e) = tokio::task::spawn_blocking(move || remove_paths(&paths)).await {
            warn!(error = %e, "Cleanup task failed");
        }
    }

    fn disarm(mut self) {
        self.paths.clear();
    }
}

impl Drop for DownloadGuard {
    fn drop(&mut self) {
        if self.paths.is_empty() {
            return;
        }

        let paths = std::mem::take(&mut self.paths);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_paths(&paths));
            }
            Err(_) => remove_paths(&paths),
        }
    }
}

fn remove_paths(paths: &[PathBuf]) {
    for path in paths {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else if path.exists() {
            std::fs::remove_file(path)
        } else {
            continue;
        };

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary model file");
        }
    }
}
