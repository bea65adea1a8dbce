//! Bag-of-words categorizer
//!
//! A linear model over word n-gram features. Each feature carries a weight
//! per category; the logit of a category is its bias plus the weights of
//! every feature found in the text. Exclusive models normalise logits with
//! softmax, non-exclusive models score each category with a sigmoid.

use crate::categorizer::{Backend, TextCategorizer};
use crate::manifest::ModelManifest;
use headline_core::{CategoryScores, Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// File holding the bag-of-words weights inside a model directory
pub const WEIGHTS_FILE: &str = "bow.json";

/// Serialized bag-of-words weights
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BagOfWordsWeights {
    /// Longest n-gram used as a feature
    #[serde(default = "default_ngram_size")]
    pub ngram_size: usize,

    /// Lowercase text before extracting features
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,

    /// Per-category bias
    #[serde(default)]
    pub bias: HashMap<String, f32>,

    /// Feature -> category -> weight
    #[serde(default)]
    pub weights: HashMap<String, HashMap<String, f32>>,
}

fn default_ngram_size() -> usize {
    1
}

fn default_lowercase() -> bool {
    true
}

pub struct BagOfWordsCategorizer {
    name: String,
    labels: Vec<String>,
    exclusive: bool,
    ngram_size: usize,
    lowercase: bool,
    bias: Vec<f32>,
    features: HashMap<String, Vec<(usize, f32)>>,
    token_pattern: Regex,
}

impl BagOfWordsCategorizer {
    /// Load from an unpacked model directory
    pub fn load(dir: &Path, manifest: &ModelManifest, name: impl Into<String>) -> Result<Self> {
        let path = dir.join(WEIGHTS_FILE);
        if !path.is_file() {
            return Err(Error::model_load(format!(
                "{} not found in {}",
                WEIGHTS_FILE,
                dir.display()
            )));
        }

        let contents = std::fs::read_to_string(&path)?;
        let weights: BagOfWordsWeights = serde_json::from_str(&contents).map_err(|e| {
            Error::model_load(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        Self::from_weights(name, manifest.labels.clone(), manifest.exclusive, weights)
    }

    /// Build from in-memory weights
    pub fn from_weights(
        name: impl Into<String>,
        labels: Vec<String>,
        exclusive: bool,
        weights: BagOfWordsWeights,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::model_load("bag-of-words model has no labels"));
        }
        if weights.ngram_size == 0 {
            return Err(Error::model_load("ngram_size must be at least 1"));
        }

        let index: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.as_str(), idx))
            .collect();
        let label_index = |label: &str| {
            index.get(label).copied().ok_or_else(|| {
                Error::model_load(format!("weights refer to unknown label '{}'", label))
            })
        };

        let mut bias = vec![0.0; labels.len()];
        for (label, value) in &weights.bias {
            bias[label_index(label)?] = *value;
        }

        let mut features = HashMap::with_capacity(weights.weights.len());
        for (feature, per_label) in weights.weights {
            let mut entries = Vec::with_capacity(per_label.len());
            for (label, value) in per_label {
                entries.push((label_index(&label)?, value));
            }
            let key = if weights.lowercase {
                feature.to_lowercase()
            } else {
                feature
            };
            features.insert(key, entries);
        }

        let token_pattern = Regex::new(r"\w+")
            .map_err(|e| Error::internal(format!("Failed to build token pattern: {e}")))?;

        Ok(Self {
            name: name.into(),
            labels,
            exclusive,
            ngram_size: weights.ngram_size,
            lowercase: weights.lowercase,
            bias,
            features,
            token_pattern,
        })
    }

    fn extract_features(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .collect();

        let mut features = Vec::new();
        for n in 1..=self.ngram_size {
            for window in tokens.windows(n) {
                features.push(window.join(" "));
            }
        }
        features
    }

    fn logits(&self, text: &str) -> Vec<f32> {
        let mut logits = self.bias.clone();
        for feature in self.extract_features(text) {
            if let Some(entries) = self.features.get(&feature) {
                for (idx, weight) in entries {
                    logits[*idx] += weight;
                }
            }
        }
        logits
    }
}

#[async_trait::async_trait]
impl TextCategorizer for BagOfWordsCategorizer {
    async fn category_scores(&self, text: &str) -> Result<CategoryScores> {
        let logits = self.logits(text);
        let scores = if self.exclusive {
            softmax(&logits)
        } else {
            logits.iter().map(|x| sigmoid(*x)).collect()
        };

        tracing::debug!(model = %self.name, ?scores, "bag-of-words scores");

        Ok(CategoryScores::from_labels(&self.labels, &scores))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn backend(&self) -> Backend {
        Backend::BagOfWords
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
