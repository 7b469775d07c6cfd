//! Store diagnostics. Not part of the embedding API.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;

use super::embeddings::TextInput;
use crate::error::ApiError;
use crate::state::AppState;

/// Value written by `POST /redis-test`.
const SCRATCH_VALUE: &str = "working";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/memory", get(get_memory))
        .route("/redis-health", get(redis_health))
        .route("/redis-test", post(redis_test))
}

/// GET /memory: every stored embedding, keyed by text.
async fn get_memory(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    match state.store.snapshot().await.map_err(ApiError::store)? {
        Some(embeddings) => Ok(Json(serde_json::json!({ "stored_embeddings": embeddings }))),
        None => Err(ApiError::NotFound(
            "Stored embeddings are only listed by the in-memory store",
        )),
    }
}

/// GET /redis-health
async fn redis_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let alive = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(backend = state.store.backend_name(), "store ping failed: {}", e);
            false
        }
    };
    Json(serde_json::json!({ "redis_alive": alive }))
}

/// POST /redis-test: write a literal under the raw text key.
async fn redis_test(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .set_scratch(&req.text, SCRATCH_VALUE)
        .await
        .map_err(ApiError::store)?;
    Ok(Json(serde_json::json!({
        "message": format!("Stored '{}' in Redis", req.text),
    })))
}
