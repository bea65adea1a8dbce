//! Top-category prediction and multi-model aggregation

use crate::categorizer::TextCategorizer;
use futures_util::future::join_all;
use headline_core::{CategoryScores, Error, Prediction, PredictionRow, Result, ResultsTable};
use std::sync::Arc;
use tracing::{debug, warn};

/// Pick the highest-scoring category
///
/// Ties go to the label that comes first in the model's declared order.
pub fn top_category(scores: &CategoryScores) -> Result<(String, f32)> {
    let mut best: Option<(&str, f32)> = None;

    for (label, score) in scores.iter() {
        if !score.is_finite() {
            return Err(Error::inference(format!(
                "non-finite score {} for category '{}'",
                score, label
            )));
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((label, score)),
        }
    }

    best.map(|(label, score)| (label.to_string(), score))
        .ok_or_else(|| Error::inference("model returned no category scores"))
}

/// Run one model on `text` and return its top category
pub async fn predict(model: &dyn TextCategorizer, name: &str, text: &str) -> Result<Prediction> {
    if text.trim().is_empty() {
        return Err(Error::invalid_input("headline is empty"));
    }

    let result = async {
        let scores = model.category_scores(text).await?;
        top_category(&scores)
    }
    .await;

    match result {
        Ok((category, score)) => {
            metrics::counter!("headline_predictions_total").increment(1);
            debug!(model = name, %category, score, "Predicted category");
            Ok(Prediction {
                model_name: name.to_string(),
                category,
                score,
            })
        }
        Err(e) => {
            metrics::counter!("headline_prediction_errors_total").increment(1);
            Err(e)
        }
    }
}

/// Predict with one model, turning a failure into a failure row
pub async fn predict_row(model: &dyn TextCategorizer, name: &str, text: &str) -> PredictionRow {
    match predict(model, name, text).await {
        Ok(prediction) => PredictionRow::predicted(prediction),
        Err(e) => {
            warn!(model = name, error = %e, "Prediction failed");
            PredictionRow::failed(name, &e)
        }
    }
}

/// Run every model on `text`; one row per model, in the given order
pub async fn aggregate(text: &str, models: &[(Arc<dyn TextCategorizer>, String)]) -> ResultsTable {
    let rows = join_all(
        models
            .iter()
            .map(|(model, name)| predict_row(model.as_ref(), name, text)),
    )
    .await;

    let mut table = ResultsTable::new(text);
    for row in rows {
        table.push(row);
    }
    table
}
