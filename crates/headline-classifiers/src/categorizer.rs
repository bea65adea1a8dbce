//! Categorizer trait and backend identifiers

use async_trait::async_trait;
use headline_core::{CategoryScores, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for all headline categorizers
///
/// Every model backend reduces to one capability: given text, return a
/// score for each category the model knows about. Prediction and
/// aggregation only ever see this trait.
#[async_trait]
pub trait TextCategorizer: Send + Sync {
    /// Score every known category for the given text
    ///
    /// Scores are returned in the order of [`TextCategorizer::labels`].
    async fn category_scores(&self, text: &str) -> Result<CategoryScores>;

    /// Get the model name
    fn name(&self) -> &str;

    /// Categories this model can predict, in declared order
    fn labels(&self) -> &[String];

    /// Backend that produced this categorizer
    fn backend(&self) -> Backend;
}

/// Model backend, as declared in a model's `meta.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Linear model over word and bigram features
    BagOfWords,
    /// BERT encoder with pooler and classification head
    Bert,
    /// DistilBERT encoder with pre-classifier and classification head
    #[serde(rename = "distilbert")]
    DistilBert,
}

impl Backend {
    /// Whether this backend needs the transformer runtime
    pub fn is_transformer(&self) -> bool {
        matches!(self, Self::Bert | Self::DistilBert)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BagOfWords => "bag-of-words",
            Self::Bert => "bert",
            Self::DistilBert => "distilbert",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names_round_trip_through_display() {
        for backend in [Backend::BagOfWords, Backend::Bert, Backend::DistilBert] {
            let json = format!("\"{}\"", backend);
            let parsed: Backend = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, backend);
        }
    }

    #[test]
    fn test_transformer_backends() {
        assert!(!Backend::BagOfWords.is_transformer());
        assert!(Backend::Bert.is_transformer());
        assert!(Backend::DistilBert.is_transformer());
    }
}
