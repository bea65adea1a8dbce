//! Transformer categorizers (BERT and DistilBERT) on Candle
//!
//! The model directory holds `config.json`, `model.safetensors` and
//! `tokenizer.json` as exported by a HuggingFace sequence-classification
//! fine-tune, next to the `meta.json` manifest.

use crate::categorizer::{Backend, TextCategorizer};
use crate::manifest::ModelManifest;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use headline_core::{CategoryScores, Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use tokenizers::{Tokenizer, TruncationDirection};

/// Hidden size as found under any of the names used by BERT-family configs
#[derive(Debug, Deserialize)]
struct HiddenSize {
    #[serde(alias = "dim")]
    hidden_size: usize,
}

enum Encoder {
    Bert {
        model: BertModel,
        pooler: Linear,
    },
    DistilBert {
        model: DistilBertModel,
        pre_classifier: Linear,
    },
}

pub struct TransformerCategorizer {
    name: String,
    labels: Vec<String>,
    exclusive: bool,
    max_length: usize,
    tokenizer: Tokenizer,
    encoder: Encoder,
    classifier: Linear,
    device: Device,
}

impl TransformerCategorizer {
    /// Load a BERT or DistilBERT sequence classifier from a model directory
    pub fn load(dir: &Path, manifest: &ModelManifest, name: impl Into<String>) -> Result<Self> {
        let device = Device::Cpu;
        let tokenizer = load_tokenizer(dir)?;
        let hidden: HiddenSize = parse_json_config(&dir.join("config.json"))?;
        let vb = load_var_builder(dir, &device)?;
        let num_labels = manifest.labels.len();

        let encoder = match manifest.backend {
            Backend::Bert => {
                let config: BertConfig = parse_json_config(&dir.join("config.json"))?;
                load_bert_encoder(&vb, &config, hidden.hidden_size)?
            }
            Backend::DistilBert => {
                let config: DistilBertConfig = parse_json_config(&dir.join("config.json"))?;
                let model = DistilBertModel::load(vb.pp("distilbert"), &config).map_err(|e| {
                    Error::model_load(format!("Failed to load DistilBERT model: {}", e))
                })?;
                let pre_classifier = candle_nn::linear(
                    hidden.hidden_size,
                    hidden.hidden_size,
                    vb.pp("pre_classifier"),
                )
                .map_err(|e| {
                    Error::model_load(format!("Failed to load pre_classifier layer: {}", e))
                })?;
                Encoder::DistilBert {
                    model,
                    pre_classifier,
                }
            }
            other => {
                return Err(Error::unsupported_format(format!(
                    "'{}' is not a transformer backend",
                    other
                )))
            }
        };

        let classifier = candle_nn::linear(hidden.hidden_size, num_labels, vb.pp("classifier"))
            .map_err(|e| {
                Error::model_load(format!(
                    "Failed to load classification head with {} labels: {}",
                    num_labels, e
                ))
            })?;

        tracing::info!(
            backend = %manifest.backend,
            labels = ?manifest.labels,
            "Loaded transformer categorizer"
        );

        Ok(Self {
            name: name.into(),
            labels: manifest.labels.clone(),
            exclusive: manifest.exclusive,
            max_length: manifest.max_length,
            tokenizer,
            encoder,
            classifier,
            device,
        })
    }

    fn logits(&self, text: &str) -> candle_core::Result<Tensor> {
        let mut encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {}", e)))?;
        encoding.truncate(self.max_length, 0, TruncationDirection::Right);

        let pooled = match &self.encoder {
            Encoder::Bert { model, pooler } => {
                let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
                let token_type_ids =
                    Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
                let hidden_states = model.forward(&input_ids, &token_type_ids, None)?;
                let cls = hidden_states.i((0, 0, ..))?.unsqueeze(0)?;
                pooler.forward(&cls)?.tanh()?
            }
            Encoder::DistilBert {
                model,
                pre_classifier,
            } => {
                let ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
                let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
                // DistilBERT masks positions where the mask is non-zero
                let inverted: Vec<u8> = encoding
                    .get_attention_mask()
                    .iter()
                    .map(|&x| u8::from(x == 0))
                    .collect();
                let mask = Tensor::new(inverted.as_slice(), &self.device)?.unsqueeze(0)?;
                let hidden_states = model.forward(&input_ids, &mask)?;
                let cls = hidden_states.i((0, 0, ..))?.unsqueeze(0)?;
                pre_classifier.forward(&cls)?.relu()?
            }
        };

        self.classifier.forward(&pooled)
    }
}

#[async_trait::async_trait]
impl TextCategorizer for TransformerCategorizer {
    async fn category_scores(&self, text: &str) -> Result<CategoryScores> {
        let logits = self
            .logits(text)
            .map_err(|e| Error::inference(format!("{} forward pass failed: {}", self.name, e)))?;

        let probs = if self.exclusive {
            candle_nn::ops::softmax(&logits, D::Minus1)
        } else {
            candle_nn::ops::sigmoid(&logits)
        }
        .and_then(|t| t.squeeze(0))
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(|e| Error::inference(format!("Failed to read probabilities: {}", e)))?;

        if probs.len() != self.labels.len() {
            return Err(Error::inference(format!(
                "model produced {} scores for {} labels",
                probs.len(),
                self.labels.len()
            )));
        }

        Ok(CategoryScores::from_labels(&self.labels, &probs))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn backend(&self) -> Backend {
        match self.encoder {
            Encoder::Bert { .. } => Backend::Bert,
            Encoder::DistilBert { .. } => Backend::DistilBert,
        }
    }
}

/// Load encoder and pooler from a `bert.`-prefixed checkpoint, or from one
/// whose encoder weights sit at the root
fn load_bert_encoder(vb: &VarBuilder, config: &BertConfig, hidden_size: usize) -> Result<Encoder> {
    let load_at = |vb: VarBuilder| -> candle_core::Result<Encoder> {
        let model = BertModel::load(vb.clone(), config)?;
        let pooler = candle_nn::linear(hidden_size, hidden_size, vb.pp("pooler.dense"))?;
        Ok(Encoder::Bert { model, pooler })
    };

    load_at(vb.pp("bert")).or_else(|prefixed| {
        load_at(vb.clone()).map_err(|bare| {
            Error::model_load(format!(
                "Failed to load BERT model: {} (unprefixed: {})",
                prefixed, bare
            ))
        })
    })
}

fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model_load(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model_load(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_tokenizer(dir: &Path) -> Result<Tokenizer> {
    let path = dir.join("tokenizer.json");
    if !path.is_file() {
        return Err(Error::model_load(format!(
            "tokenizer.json not found in {}",
            dir.display()
        )));
    }
    Tokenizer::from_file(&path)
        .map_err(|e| Error::model_load(format!("Failed to load tokenizer.json: {}", e)))
}

fn load_var_builder(dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(Error::model_load(format!(
            "model.safetensors not found in {}",
            dir.display()
        )));
    }

    // SAFETY: the weights file lives in the model cache directory and is
    // not modified while mapped.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
            .map_err(|e| Error::model_load(format!("Failed to load weights: {}", e)))?
    };

    Ok(vb)
}
