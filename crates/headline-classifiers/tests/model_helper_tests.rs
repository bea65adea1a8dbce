//! Fetch-or-reuse behaviour of the model helper against a scripted store

use async_trait::async_trait;
use headline_classifiers::{
    predict, FetchOutcome, LocalObjectStore, ModelCache, ModelHelper, ObjectStore,
};
use headline_core::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zip::write::SimpleFileOptions;

const META: &str = r#"{
    "name": "news_bow",
    "version": "1.0.0",
    "backend": "bag-of-words",
    "labels": ["science", "sports", "politics"]
}"#;

const WEIGHTS: &str = r#"{
    "ngram_size": 1,
    "bias": {"science": 0.0, "sports": 0.0, "politics": 0.0},
    "weights": {
        "moon": {"science": 3.0},
        "walk": {"science": 0.5, "sports": 0.5},
        "goal": {"sports": 3.0},
        "election": {"politics": 3.0}
    }
}"#;

fn model_zip(prefix: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in [("meta.json", META), ("bow.json", WEIGHTS)] {
        writer
            .start_file(format!("{}{}", prefix, name), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Store serving a fixed set of objects and counting every fetch
#[derive(Default)]
struct ScriptedStore {
    objects: Vec<(String, String, Vec<u8>)>,
    fetches: AtomicUsize,
}

impl ScriptedStore {
    fn with_object(mut self, bucket: &str, key: &str, body: Vec<u8>) -> Self {
        self.objects.push((bucket.to_string(), key.to_string(), body));
        self
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for ScriptedStore {
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let (_, _, body) = self
            .objects
            .iter()
            .find(|(b, k, _)| b == bucket && k == key)
            .ok_or_else(|| Error::not_found(bucket, key))?;
        tokio::fs::write(dest, body).await?;
        Ok(body.len() as u64)
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn helper(root: &Path) -> ModelHelper {
    ModelHelper::new("news_bow").with_base_path(root.join("news_bow"))
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(read) => read.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_download_unpack_and_load() {
    let root = tempfile::tempdir().unwrap();
    let store = ScriptedStore::default().with_object("models", "news.zip", model_zip(""));
    let helper = helper(root.path());

    let outcome = helper.ensure_present(&store, "models", "news.zip").await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Downloaded { .. }));
    assert!(helper.model_path().join("meta.json").is_file());
    // Only the unpacked model remains
    assert!(!helper.archive_path().exists());
    assert_eq!(entries(helper.base_path()), vec![helper.model_path()]);

    let cache = ModelCache::new();
    let model = helper
        .load_from_remote(&cache, &store, "models", "news.zip")
        .await
        .unwrap();
    let prediction = predict(model.as_ref(), "news_bow", "Men Walk on Moon")
        .await
        .unwrap();
    assert_eq!(prediction.category, "science");
    assert_eq!(store.fetches(), 1);
}

#[tokio::test]
async fn test_repeat_calls_return_same_handle() {
    let root = tempfile::tempdir().unwrap();
    let store = ScriptedStore::default().with_object("models", "news.zip", model_zip(""));
    let helper = helper(root.path());
    let cache = ModelCache::new();

    let first = helper
        .load_from_remote(&cache, &store, "models", "news.zip")
        .await
        .unwrap();
    let second = helper
        .load_from_remote(&cache, &store, "models", "news.zip")
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.fetches(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_existing_directory_skips_storage() {
    let root = tempfile::tempdir().unwrap();
    let helper = helper(root.path());
    std::fs::create_dir_all(helper.model_path()).unwrap();
    std::fs::write(helper.model_path().join("meta.json"), META).unwrap();
    std::fs::write(helper.model_path().join("bow.json"), WEIGHTS).unwrap();

    let store = ScriptedStore::default();
    let cache = ModelCache::new();
    let model = helper
        .load_from_remote(&cache, &store, "models", "news.zip")
        .await
        .unwrap();

    assert_eq!(store.fetches(), 0);
    assert_eq!(model.name(), "news_bow");
}

#[tokio::test]
async fn test_missing_object_leaves_nothing_behind() {
    let root = tempfile::tempdir().unwrap();
    let store = ScriptedStore::default();
    let helper = helper(root.path());
    let cache = ModelCache::new();

    let err = helper
        .load_from_remote(&cache, &store, "models", "missing.zip")
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::NotFound { .. }));
    assert!(!helper.is_present());
    assert!(entries(helper.base_path()).is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_failed_fetch_is_retried_on_next_call() {
    let root = tempfile::tempdir().unwrap();
    let helper = helper(root.path());
    let cache = ModelCache::new();

    let empty = ScriptedStore::default();
    assert!(helper
        .load_from_remote(&cache, &empty, "models", "news.zip")
        .await
        .is_err());

    let store = ScriptedStore::default().with_object("models", "news.zip", model_zip(""));
    let model = helper
        .load_from_remote(&cache, &store, "models", "news.zip")
        .await
        .unwrap();
    assert_eq!(model.labels().len(), 3);
    assert_eq!(store.fetches(), 1);
}

#[tokio::test]
async fn test_corrupt_archive_is_cleaned_up() {
    let root = tempfile::tempdir().unwrap();
    let store = ScriptedStore::default().with_object(
        "models",
        "news.zip",
        b"this is not a zip archive".to_vec(),
    );
    let helper = helper(root.path());

    let err = helper
        .ensure_present(&store, "models", "news.zip")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Archive(_)));
    assert!(!helper.is_present());
    assert!(entries(helper.base_path()).is_empty());
}

#[tokio::test]
async fn test_archive_without_manifest_is_unsupported() {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("weights.bin", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"\x00\x01").unwrap();
    let body = writer.finish().unwrap().into_inner();

    let root = tempfile::tempdir().unwrap();
    let store = ScriptedStore::default().with_object("models", "news.zip", body);
    let helper = helper(root.path());

    let err = helper
        .ensure_present(&store, "models", "news.zip")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedFormat(_)));
    assert!(!helper.is_present());
    assert!(entries(helper.base_path()).is_empty());
}

#[tokio::test]
async fn test_incomplete_archive_is_not_installed() {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("meta.json", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(META.as_bytes()).unwrap();
    let manifest_only = writer.finish().unwrap().into_inner();

    let root = tempfile::tempdir().unwrap();
    let helper = helper(root.path());
    let cache = ModelCache::new();

    let broken = ScriptedStore::default().with_object("models", "news.zip", manifest_only);
    let err = helper
        .load_from_remote(&cache, &broken, "models", "news.zip")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::Archive(_)), "{err}");
    assert!(!helper.is_present());
    assert!(entries(helper.base_path()).is_empty());

    // A fixed archive is downloaded on the next attempt
    let fixed = ScriptedStore::default().with_object("models", "news.zip", model_zip(""));
    let model = helper
        .load_from_remote(&cache, &fixed, "models", "news.zip")
        .await
        .unwrap();
    assert_eq!(model.labels().len(), 3);
    assert_eq!(fixed.fetches(), 1);
}

/// Store that writes part of the object and then never finishes
struct StalledStore;

#[async_trait]
impl ObjectStore for StalledStore {
    async fn fetch(&self, _bucket: &str, _key: &str, dest: &Path) -> Result<u64> {
        tokio::fs::write(dest, b"PK\x03\x04partial").await?;
        std::future::pending::<()>().await;
        Ok(0)
    }

    fn describe(&self) -> String {
        "stalled".to_string()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_download_is_cleaned_up() {
    let root = tempfile::tempdir().unwrap();
    let helper = helper(root.path());

    let result = tokio::time::timeout(
        std::time::Duration::from_millis(200),
        helper.ensure_present(&StalledStore, "models", "news.zip"),
    )
    .await;
    assert!(result.is_err());

    // Removal runs on the blocking pool after the future is dropped
    for _ in 0..100 {
        if entries(helper.base_path()).is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(entries(helper.base_path()).is_empty());
    assert!(!helper.is_present());
}

#[tokio::test]
async fn test_archive_with_nested_root() {
    let root = tempfile::tempdir().unwrap();
    let store = ScriptedStore::default().with_object(
        "models",
        "news.zip",
        model_zip("model-best/"),
    );
    let helper = helper(root.path());

    helper.ensure_present(&store, "models", "news.zip").await.unwrap();

    assert!(helper.model_path().join("meta.json").is_file());
    assert!(helper.model_path().join("bow.json").is_file());
}

#[tokio::test]
async fn test_missing_bucket_is_configuration_error() {
    let root = tempfile::tempdir().unwrap();
    let store = ScriptedStore::default();

    let err = helper(root.path())
        .ensure_present(&store, "", "news.zip")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(store.fetches(), 0);
}

#[tokio::test]
async fn test_local_object_store_end_to_end() {
    let bucket_root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(bucket_root.path().join("models/news")).unwrap();
    std::fs::write(
        bucket_root.path().join("models/news/model-best.zip"),
        model_zip(""),
    )
    .unwrap();

    let work = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(bucket_root.path());
    let cache = ModelCache::new();
    let model = helper(work.path())
        .load_from_remote(&cache, &store, "models", "news/model-best.zip")
        .await
        .unwrap();

    let prediction = predict(model.as_ref(), "news_bow", "Late goal wins the cup")
        .await
        .unwrap();
    assert_eq!(prediction.category, "sports");
}

#[tokio::test]
async fn test_load_local_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("meta.json"), META).unwrap();
    std::fs::write(dir.path().join("bow.json"), WEIGHTS).unwrap();

    let cache = ModelCache::new();
    let helper = ModelHelper::new("local_bow");
    let first = helper.load_local(&cache, dir.path()).await.unwrap();
    let second = helper.load_local(&cache, dir.path()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name(), "local_bow");
}
