//! Liveness and model catalogue.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use senvec_core::ModelKind;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/models", get(list_models))
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "API running" }))
}

/// GET /models
async fn list_models() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "available_models": ModelKind::available_models(),
    }))
}
