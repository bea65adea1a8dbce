//! Model manifest (`meta.json`) describing an unpacked model directory

use crate::categorizer::Backend;
use headline_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File name of the manifest at the root of every model directory
pub const MANIFEST_FILE: &str = "meta.json";

/// Manifest of a serialized model directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Model name recorded at training time
    #[serde(default)]
    pub name: String,

    /// Model version
    #[serde(default)]
    pub version: String,

    /// Backend able to load the directory
    pub backend: Backend,

    /// Known categories, in declared order
    pub labels: Vec<String>,

    /// Mutually exclusive categories (softmax) or independent (sigmoid)
    #[serde(default = "default_exclusive")]
    pub exclusive: bool,

    /// Maximum token sequence length for transformer backends
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_exclusive() -> bool {
    true
}

fn default_max_length() -> usize {
    512
}

impl ModelManifest {
    /// Read and validate the manifest of a model directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(Error::unsupported_format(format!(
                "{} not found in {}",
                MANIFEST_FILE,
                dir.display()
            )));
        }

        let contents = std::fs::read_to_string(&path)?;
        let manifest: ModelManifest = serde_json::from_str(&contents).map_err(|e| {
            Error::unsupported_format(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::unsupported_format("model declares no labels"));
        }

        let mut seen = HashSet::new();
        for label in &self.labels {
            if !seen.insert(label.as_str()) {
                return Err(Error::unsupported_format(format!(
                    "duplicate label '{}'",
                    label
                )));
            }
        }

        Ok(())
    }
}

/// Locate the model root inside an unpacked directory
///
/// Archives are accepted either with the manifest at their root or wrapped
/// in a single top-level directory.
pub fn resolve_model_root(dir: &Path) -> Result<PathBuf> {
    if dir.join(MANIFEST_FILE).is_file() {
        return Ok(dir.to_path_buf());
    }

    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        }
    }

    match subdirs.as_slice() {
        [only] if only.join(MANIFEST_FILE).is_file() => Ok(only.clone()),
        _ => Err(Error::unsupported_format(format!(
            "no {} found in {}",
            MANIFEST_FILE,
            dir.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, json: &str) {
        std::fs::write(dir.join(MANIFEST_FILE), json).unwrap();
    }

    #[test]
    fn test_parse_manifest_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{"backend": "bag-of-words", "labels": ["science", "sports"]}"#,
        );

        let manifest = ModelManifest::from_dir(dir.path()).unwrap();
        assert_eq!(manifest.backend, Backend::BagOfWords);
        assert_eq!(manifest.labels, vec!["science", "sports"]);
        assert!(manifest.exclusive);
        assert_eq!(manifest.max_length, 512);
    }

    #[test]
    fn test_missing_manifest_is_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelManifest::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_unknown_backend_is_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), r#"{"backend": "spacy", "labels": ["a"]}"#);
        let err = ModelManifest::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{"backend": "bag-of-words", "labels": ["a", "a"]}"#,
        );
        assert!(ModelManifest::from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_resolve_nested_root() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("model-best");
        std::fs::create_dir(&inner).unwrap();
        write_manifest(&inner, r#"{"backend": "bag-of-words", "labels": ["a"]}"#);

        assert_eq!(resolve_model_root(dir.path()).unwrap(), inner);
        assert_eq!(resolve_model_root(&inner).unwrap(), inner);
    }

    #[test]
    fn test_resolve_ambiguous_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("one")).unwrap();
        std::fs::create_dir(dir.path().join("two")).unwrap();
        assert!(resolve_model_root(dir.path()).is_err());
    }
}
