//! Shared prediction types

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Per-category scores for one input, in the model's declared label order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores(Vec<(String, f32)>);

impl CategoryScores {
    /// Create scores from `(label, score)` pairs
    pub fn new(scores: Vec<(String, f32)>) -> Self {
        Self(scores)
    }

    /// Pair declared labels with a score vector of the same length
    pub fn from_labels(labels: &[String], scores: &[f32]) -> Self {
        Self(
            labels
                .iter()
                .cloned()
                .zip(scores.iter().copied())
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(label, score)| (label.as_str(), *score))
    }

    /// Score for a label, if the label is known
    pub fn get(&self, label: &str) -> Option<f32> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, s)| *s)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<(String, f32)> {
        self.0
    }
}

impl FromIterator<(String, f32)> for CategoryScores {
    fn from_iter<I: IntoIterator<Item = (String, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Top-scoring category of one model for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub model_name: String,
    pub category: String,
    pub score: f32,
}

impl Prediction {
    /// Markdown block naming the model, category and score
    pub fn to_markdown(&self) -> String {
        format!(
            "__Model: {}__\n\nPredicted Category: {}\n\nPredicted Score: {:.3}\n\n",
            self.model_name, self.category, self.score
        )
    }
}

/// Outcome of a single results-table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Predicted { category: String, score: f32 },
    Failed { kind: ErrorKind, message: String },
}

/// One row of the results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub model_name: String,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

impl PredictionRow {
    pub fn predicted(prediction: Prediction) -> Self {
        Self {
            model_name: prediction.model_name,
            outcome: RowOutcome::Predicted {
                category: prediction.category,
                score: prediction.score,
            },
        }
    }

    pub fn failed(model_name: impl Into<String>, error: &Error) -> Self {
        Self {
            model_name: model_name.into(),
            outcome: RowOutcome::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, RowOutcome::Failed { .. })
    }

    fn cells(&self) -> [String; 3] {
        match &self.outcome {
            RowOutcome::Predicted { category, score } => [
                self.model_name.clone(),
                category.clone(),
                format!("{:.3}", score),
            ],
            RowOutcome::Failed { kind, message } => [
                self.model_name.clone(),
                format!("error ({:?})", kind).to_lowercase(),
                message.clone(),
            ],
        }
    }
}

/// Ordered prediction rows, one per model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    pub headline: String,
    pub columns: Vec<String>,
    pub rows: Vec<PredictionRow>,
}

/// Column headers of the results table
pub const RESULT_COLUMNS: [&str; 3] = ["Model Name", "Predicted Category", "Predicted Score"];

impl ResultsTable {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            columns: RESULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: PredictionRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that carry a failure instead of a prediction
    pub fn failures(&self) -> impl Iterator<Item = &PredictionRow> {
        self.rows.iter().filter(|r| r.is_failure())
    }

    /// Aligned plain-text table
    pub fn to_text(&self) -> String {
        let cells: Vec<[String; 3]> = self.rows.iter().map(PredictionRow::cells).collect();

        let mut widths = RESULT_COLUMNS.map(str::len);
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let header = RESULT_COLUMNS.map(str::to_string);
        for row in std::iter::once(&header).chain(cells.iter()) {
            let line: Vec<String> = row
                .iter()
                .zip(widths.iter())
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            let _ = writeln!(out, "{}", line.join("  ").trim_end());
        }
        out
    }

    /// Markdown table
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "| {} |", RESULT_COLUMNS.join(" | "));
        let _ = writeln!(out, "|---|---|---|");
        for row in &self.rows {
            let [name, category, score] = row.cells();
            let _ = writeln!(out, "| {} | {} | {} |", name, category, score);
        }
        out
    }
}
