//! senvec infer: sentence encoders, query cache, cosine similarity.
//!
//! Provides the `EmbedderBackend` trait for generating embeddings.
//! When the `onnx` feature is enabled and model files are present,
//! `OnnxEmbedder` serves each `ModelKind` from `<model_dir>/<model id>/`.
//! Otherwise the kind is backed by `UnavailableEmbedder`, and requests that
//! need it fail with `Error::ModelUnavailable`.

pub mod cache;
pub mod embedder;
pub mod onnx_embedder;
pub mod similarity;

pub use cache::QueryCache;
pub use embedder::{EmbedderBackend, EmbeddingResult, Encoders, UnavailableEmbedder};
pub use similarity::{cosine_distance, cosine_similarity, l2_normalize, round3};

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use senvec_core::ModelKind;

/// Create the best available encoder for one model kind.
pub fn create_embedder(
    model_dir: &Path,
    kind: ModelKind,
    cache_size: usize,
    cache_ttl: Duration,
) -> Arc<dyn EmbedderBackend> {
    #[cfg(feature = "onnx")]
    let embedder: Arc<dyn EmbedderBackend> =
        match OnnxEmbedder::load(model_dir, kind, cache_size, cache_ttl) {
            Ok(embedder) => Arc::new(embedder),
            Err(e) => {
                tracing::warn!(model = kind.model_id(), "ONNX encoder unavailable: {}", e);
                let reason = match e {
                    senvec_core::Error::ModelUnavailable(msg) => msg,
                    other => other.to_string(),
                };
                Arc::new(UnavailableEmbedder::new(kind, reason))
            }
        };

    #[cfg(not(feature = "onnx"))]
    let embedder: Arc<dyn EmbedderBackend> = {
        let _ = (model_dir, cache_size, cache_ttl);
        tracing::warn!(model = kind.model_id(), "ONNX feature disabled; encoder unavailable");
        Arc::new(UnavailableEmbedder::new(kind, "built without the onnx feature"))
    };

    embedder
}

/// Load both encoders from `model_dir`.
pub fn create_encoders(model_dir: &Path, cache_size: usize, cache_ttl: Duration) -> Encoders {
    let encoders = Encoders::new(
        create_embedder(model_dir, ModelKind::Paraphrase, cache_size, cache_ttl),
        create_embedder(model_dir, ModelKind::Qa, cache_size, cache_ttl),
    );
    tracing::info!(
        "Encoders ready: {}/{} loaded",
        encoders.loaded().len(),
        ModelKind::ALL.len()
    );
    encoders
}
