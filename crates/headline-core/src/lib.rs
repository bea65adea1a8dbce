//! Headline Classifier Core
//!
//! Types and error handling shared across the headline classifier crates.
//!
//! This crate provides:
//! - The error taxonomy (configuration, transfer, artifact, inference)
//! - Per-category scores, predictions and the results table

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{
    CategoryScores, Prediction, PredictionRow, ResultsTable, RowOutcome, RESULT_COLUMNS,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::types::{CategoryScores, Prediction, PredictionRow, ResultsTable};
}
