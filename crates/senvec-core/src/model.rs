//! The two sentence encoders served by senvec and the policy that picks one.

use serde::{Deserialize, Serialize};

/// A pretrained sentence encoder known to the service.
///
/// Each kind owns a storage key prefix and a search index name, so records
/// written with one encoder are only ever searched with the same encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// General-purpose multilingual paraphrase encoder.
    Paraphrase,
    /// Question/answer retrieval encoder.
    Qa,
}

impl ModelKind {
    /// Every kind, in the order reported by `GET /models`.
    pub const ALL: [ModelKind; 2] = [ModelKind::Paraphrase, ModelKind::Qa];

    /// Pick the encoder for a piece of text: questions go to the QA model.
    pub fn select_for(text: &str) -> Self {
        if text.contains('?') {
            ModelKind::Qa
        } else {
            ModelKind::Paraphrase
        }
    }

    /// Encoder used for pairwise comparison, independent of the text.
    pub fn for_comparison() -> Self {
        ModelKind::Paraphrase
    }

    /// Pretrained model identifier (also the model directory name).
    pub fn model_id(self) -> &'static str {
        match self {
            ModelKind::Paraphrase => "paraphrase-multilingual-mpnet-base-v2",
            ModelKind::Qa => "multi-qa-MiniLM-L6-cos-v1",
        }
    }

    /// Short tag used as the storage key prefix.
    pub fn key_prefix(self) -> &'static str {
        match self {
            ModelKind::Paraphrase => "para:",
            ModelKind::Qa => "qa:",
        }
    }

    /// Name of the vector index built over this kind's records.
    pub fn index_name(self) -> &'static str {
        match self {
            ModelKind::Paraphrase => "para_idx",
            ModelKind::Qa => "qa_idx",
        }
    }

    /// Output dimension of the encoder.
    pub fn dimension(self) -> usize {
        match self {
            ModelKind::Paraphrase => 768,
            ModelKind::Qa => 384,
        }
    }

    /// Whether the ONNX graph takes a `token_type_ids` input (BERT-style).
    /// MPNet graphs only take ids and mask.
    pub fn uses_token_type_ids(self) -> bool {
        matches!(self, ModelKind::Qa)
    }

    /// Whether the sentence-transformers pipeline ends in a Normalize layer.
    pub fn normalizes_output(self) -> bool {
        matches!(self, ModelKind::Qa)
    }

    /// Storage key for a record of this kind.
    pub fn storage_key(self, text: &str) -> String {
        format!("{}{}", self.key_prefix(), text)
    }

    /// Model identifiers in catalogue order.
    pub fn available_models() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.model_id()).collect()
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.model_id())
    }
}
