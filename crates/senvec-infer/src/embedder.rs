//! Embedding engine trait and implementations.
//!
//! The `EmbedderBackend` trait abstracts over embedding generation.
//! Implementations:
//! - `OnnxEmbedder`: ONNX Runtime sentence-transformers model (requires the `onnx` feature)
//! - `UnavailableEmbedder`: stands in for a model that could not be loaded

use std::sync::Arc;

use ndarray::Array1;
use senvec_core::{Error, ModelKind, Result};

/// Result of an embedding operation.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    pub embedding: Array1<f32>,
    /// Whether this was served from cache.
    pub cached: bool,
}

/// Trait for embedding backends.
pub trait EmbedderBackend: Send + Sync {
    /// Generate an embedding for a text string.
    fn embed(&self, text: &str) -> Result<EmbeddingResult>;

    /// Identifier of the pretrained model behind this backend.
    fn model_id(&self) -> &str;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Check if the embedder is available (model loaded).
    fn is_available(&self) -> bool;
}

/// Backend for a model whose files were missing or failed to load.
pub struct UnavailableEmbedder {
    kind: ModelKind,
    reason: String,
}

impl UnavailableEmbedder {
    pub fn new(kind: ModelKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl EmbedderBackend for UnavailableEmbedder {
    fn embed(&self, _text: &str) -> Result<EmbeddingResult> {
        Err(Error::ModelUnavailable(format!(
            "{}: {}",
            self.kind.model_id(),
            self.reason
        )))
    }

    fn model_id(&self) -> &str {
        self.kind.model_id()
    }

    fn dimension(&self) -> usize {
        self.kind.dimension()
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// One backend per `ModelKind`, loaded once at startup.
#[derive(Clone)]
pub struct Encoders {
    paraphrase: Arc<dyn EmbedderBackend>,
    qa: Arc<dyn EmbedderBackend>,
}

impl Encoders {
    pub fn new(paraphrase: Arc<dyn EmbedderBackend>, qa: Arc<dyn EmbedderBackend>) -> Self {
        Self { paraphrase, qa }
    }

    pub fn get(&self, kind: ModelKind) -> &Arc<dyn EmbedderBackend> {
        match kind {
            ModelKind::Paraphrase => &self.paraphrase,
            ModelKind::Qa => &self.qa,
        }
    }

    /// Encode `text` with the encoder for `kind`, returning the raw vector.
    pub fn encode(&self, kind: ModelKind, text: &str) -> Result<Array1<f32>> {
        self.get(kind).embed(text).map(|r| r.embedding)
    }

    /// Kinds whose model is loaded.
    pub fn loaded(&self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_available())
            .collect()
    }
}
