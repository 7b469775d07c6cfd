//! Records and search results exchanged with the store.

use serde::{Deserialize, Serialize};

/// A persisted embedding: the hash written under `<prefix><text>`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub text: String,
    /// Packed little-endian f32, see [`crate::embedding`].
    pub vector: Vec<u8>,
}

/// One nearest-neighbor match as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Storage key of the matched record.
    pub id: String,
    pub text: String,
    /// Cosine distance to the query (0 = same direction).
    pub score: f64,
}

/// Reply of a KNN query, in store order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total: u64,
    pub documents: Vec<SearchHit>,
}
