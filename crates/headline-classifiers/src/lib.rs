//! Headline Classifiers
//!
//! Text categorizers for news headlines and the plumbing that gets trained
//! models from remote storage into memory.
//!
//! Models are served from a fetch-or-reuse pipeline:
//! - [`storage`]: copy a model archive out of S3 (or a local stand-in)
//! - [`helper`]: download, unpack and validate the archive under a per-model
//!   directory, reusing it when already present
//! - [`loader`]: turn an unpacked directory into a [`TextCategorizer`]
//! - [`cache`]: keep loaded models for the lifetime of the process
//!
//! Two backend families are supported: a linear bag-of-words model that runs
//! anywhere, and BERT / DistilBERT sequence classifiers built on Candle
//! (behind the `ml-models` feature, enabled by default).

pub mod archive;
pub mod bag_of_words;
pub mod cache;
pub mod categorizer;
pub mod helper;
pub mod loader;
pub mod manifest;
pub mod predict;
pub mod storage;

#[cfg(feature = "ml-models")]
pub mod transformer;

pub use bag_of_words::{BagOfWordsCategorizer, BagOfWordsWeights};
pub use cache::{CacheKey, ModelCache};
pub use categorizer::{Backend, TextCategorizer};
pub use helper::{FetchOutcome, ModelHelper};
pub use loader::load_model_dir;
pub use manifest::ModelManifest;
pub use predict::{aggregate, predict, predict_row, top_category};
pub use storage::{Credentials, LocalObjectStore, ObjectStore, S3ObjectStore, S3Settings};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheKey, ModelCache};
    pub use crate::categorizer::{Backend, TextCategorizer};
    pub use crate::helper::ModelHelper;
    pub use crate::predict::{aggregate, predict};
    pub use crate::storage::{LocalObjectStore, ObjectStore, S3ObjectStore};
}
