use crate::hello::HelloTable;
use crate::server::pages;
use crate::state::{AppState, LoadReport, ModelStatus};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Pages
// ============================================================================

pub async fn index_page() -> Html<&'static str> {
    Html(pages::INDEX_HTML)
}

pub async fn hello_page() -> Html<&'static str> {
    Html(pages::HELLO_HTML)
}

// ============================================================================
// Health endpoints
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// Model endpoints
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub default_headline: String,
    pub models: Vec<ModelStatus>,
}

pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default_headline: state.config.default_headline.clone(),
        models: state.model_statuses(),
    })
}

#[derive(Debug, Serialize)]
pub struct LoadModelsResponse {
    pub models: Vec<LoadReport>,
}

pub async fn load_models(State(state): State<AppState>) -> Json<LoadModelsResponse> {
    Json(LoadModelsResponse {
        models: state.load_reports().await,
    })
}

// ============================================================================
// Prediction endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub headline: String,
}

pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Response {
    let headline = req.headline.trim();
    if headline.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Headline must not be empty" })),
        )
            .into_response();
    }

    tracing::info!(%headline, "Classifying headline");
    let table = state.classify(headline).await;
    Json(table).into_response()
}

// ============================================================================
// Hello endpoints
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct HelloQuery {
    #[serde(default)]
    pub shuffle: bool,
}

pub async fn hello_data(Query(query): Query<HelloQuery>) -> Json<HelloTable> {
    let table = if query.shuffle {
        HelloTable::shuffled(&mut rand::thread_rng())
    } else {
        HelloTable::seeded()
    };
    Json(table)
}
