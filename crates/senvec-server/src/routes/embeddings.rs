//! Embedding routes: embed, compare, similarity search.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use senvec_core::ModelKind;
use senvec_infer::{cosine_similarity, round3};
use senvec_store::{SearchResults, SEARCH_TOP_K};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/embed", post(embed_text))
        .route("/compare", post(compare_texts))
        .route("/similarity_search", post(similarity_search))
}

#[derive(Debug, Deserialize)]
pub struct TextInput {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CompareInput {
    pub text1: String,
    pub text2: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub text: String,
    pub model_used: &'static str,
    pub vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub text1: String,
    pub text2: String,
    pub similarity: f64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: SearchResults,
}

/// Trimmed text, or `None` when nothing is left.
fn non_empty(raw: &str) -> Option<&str> {
    let text = raw.trim();
    (!text.is_empty()).then_some(text)
}

// ---------------------------------------------------------------
// Embed
// ---------------------------------------------------------------

/// POST /embed: encode with the selected model and persist the vector.
async fn embed_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextInput>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let text = non_empty(&req.text).ok_or(ApiError::BadRequest("Text cannot be empty"))?;
    let kind = ModelKind::select_for(text);

    let vector = state
        .encode(kind, text)
        .await
        .map_err(|e| ApiError::encoder("Vector generation failed", e))?;

    state
        .store
        .put_embedding(kind, text, &vector)
        .await
        .map_err(ApiError::store)?;
    debug!(model = kind.model_id(), dim = vector.len(), "stored embedding");

    Ok(Json(EmbedResponse {
        text: text.to_string(),
        model_used: kind.model_id(),
        vector,
    }))
}

// ---------------------------------------------------------------
// Compare
// ---------------------------------------------------------------

/// POST /compare: cosine similarity of two texts under the comparison model.
async fn compare_texts(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompareInput>,
) -> Result<Json<CompareResponse>, ApiError> {
    let (text1, text2) = match (non_empty(&req.text1), non_empty(&req.text2)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(ApiError::BadRequest("Texts cannot be empty")),
    };
    let kind = ModelKind::for_comparison();

    let emb1 = state
        .encode(kind, text1)
        .await
        .map_err(|e| ApiError::encoder("Comparison failed", e))?;
    let emb2 = state
        .encode(kind, text2)
        .await
        .map_err(|e| ApiError::encoder("Comparison failed", e))?;

    let similarity = cosine_similarity(ArrayView1::from(&emb1), ArrayView1::from(&emb2));

    Ok(Json(CompareResponse {
        text1: text1.to_string(),
        text2: text2.to_string(),
        similarity: round3(similarity),
    }))
}

// ---------------------------------------------------------------
// Similarity search
// ---------------------------------------------------------------

/// POST /similarity_search: top-3 stored neighbors under the selected
/// model's index.
async fn similarity_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextInput>,
) -> Result<Json<SearchResponse>, ApiError> {
    let text = non_empty(&req.text).ok_or(ApiError::BadRequest("Text cannot be empty"))?;
    let kind = ModelKind::select_for(text);

    let query = state
        .encode(kind, text)
        .await
        .map_err(|e| ApiError::encoder("Vector generation failed", e))?;

    let results = state
        .store
        .knn(kind, &query, SEARCH_TOP_K)
        .await
        .map_err(ApiError::store)?;

    Ok(Json(SearchResponse { results }))
}
