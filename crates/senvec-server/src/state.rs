//! Shared application state.

use std::sync::Arc;

use senvec_core::{Error, ModelKind, Result};
use senvec_infer::Encoders;
use senvec_store::VectorStore;
use tracing::debug;

/// Shared application state accessible from all route handlers.
///
/// Owns the encoders and the store client for the lifetime of the server;
/// `main` connects the store before building it and shuts the store down
/// after the listener stops.
pub struct AppState {
    pub encoders: Encoders,
    pub store: Arc<dyn VectorStore>,
}

impl AppState {
    pub fn new(encoders: Encoders, store: Arc<dyn VectorStore>) -> Self {
        Self { encoders, store }
    }

    /// Encode `text` with `kind` on the blocking pool.
    pub async fn encode(&self, kind: ModelKind, text: &str) -> Result<Vec<f32>> {
        let backend = Arc::clone(self.encoders.get(kind));
        let text = text.to_string();
        let result = tokio::task::spawn_blocking(move || backend.embed(&text))
            .await
            .map_err(|e| Error::Internal(format!("encoder task failed: {}", e)))??;
        debug!(model = kind.model_id(), cached = result.cached, "encoded text");
        Ok(result.embedding.to_vec())
    }
}
