//! Load an unpacked model directory into a categorizer

use crate::bag_of_words::{BagOfWordsCategorizer, WEIGHTS_FILE};
use crate::categorizer::{Backend, TextCategorizer};
use crate::manifest::{resolve_model_root, ModelManifest};
use headline_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Load the model stored in `dir`, dispatching on its manifest backend
///
/// `name` is the display name the model is registered under; it takes
/// precedence over the name recorded in the manifest.
pub fn load_model_dir(dir: &Path, name: &str) -> Result<Arc<dyn TextCategorizer>> {
    if !dir.is_dir() {
        return Err(Error::model_load(format!(
            "Model directory does not exist: {}",
            dir.display()
        )));
    }

    let root = resolve_model_root(dir)?;
    let manifest = ModelManifest::from_dir(&root)?;

    tracing::debug!(
        model = name,
        backend = %manifest.backend,
        version = %manifest.version,
        path = %root.display(),
        "Loading model directory"
    );

    let categorizer: Arc<dyn TextCategorizer> = match manifest.backend {
        Backend::BagOfWords => Arc::new(BagOfWordsCategorizer::load(&root, &manifest, name)?),
        Backend::Bert | Backend::DistilBert => load_transformer(&root, &manifest, name)?,
    };

    Ok(categorizer)
}

/// Files a backend reads from the model directory, besides the manifest
pub fn required_files(backend: Backend) -> &'static [&'static str] {
    match backend {
        Backend::BagOfWords => &[WEIGHTS_FILE],
        Backend::Bert | Backend::DistilBert => {
            &["config.json", "tokenizer.json", "model.safetensors"]
        }
    }
}

/// Check that an unpacked directory holds a complete model
///
/// Reads the manifest and every backend file's presence; small JSON files
/// are parsed so a truncated archive is caught before it is installed.
/// Weights are not loaded.
pub fn validate_model_dir(dir: &Path) -> Result<ModelManifest> {
    let root = resolve_model_root(dir)?;
    let manifest = ModelManifest::from_dir(&root)?;

    let missing: Vec<&str> = required_files(manifest.backend)
        .iter()
        .copied()
        .filter(|file| !root.join(file).is_file())
        .collect();
    if !missing.is_empty() {
        return Err(Error::archive(format!(
            "'{}' model in {} is missing {}",
            manifest.backend,
            root.display(),
            missing.join(", ")
        )));
    }

    match manifest.backend {
        Backend::BagOfWords => {
            BagOfWordsCategorizer::load(&root, &manifest, manifest.name.clone())?;
        }
        Backend::Bert | Backend::DistilBert => {
            let path = root.join("config.json");
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str::<serde_json::Value>(&contents).map_err(|e| {
                Error::archive(format!("Invalid {}: {}", path.display(), e))
            })?;
        }
    }

    Ok(manifest)
}

#[cfg(feature = "ml-models")]
fn load_transformer(
    dir: &Path,
    manifest: &ModelManifest,
    name: &str,
) -> Result<Arc<dyn TextCategorizer>> {
    let model = crate::transformer::TransformerCategorizer::load(dir, manifest, name)?;
    Ok(Arc::new(model))
}

#[cfg(not(feature = "ml-models"))]
fn load_transformer(
    _dir: &Path,
    manifest: &ModelManifest,
    _name: &str,
) -> Result<Arc<dyn TextCategorizer>> {
    Err(Error::unsupported_format(format!(
        "'{}' models require the 'ml-models' feature",
        manifest.backend
    )))
}
