//! Process-local store. Records live until the process exits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use ndarray::ArrayView1;
use senvec_core::{Error, ModelKind, Result};
use senvec_infer::cosine_distance;

use crate::embedding::{bytes_to_vector, vector_to_bytes};
use crate::types::{SearchHit, SearchResults, StoredEmbedding};
use crate::VectorStore;

/// In-memory `VectorStore` using the same key scheme as Redis.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<String, StoredEmbedding>,
    scratch: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of embedding records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<StoredEmbedding> {
        self.records.get(key).map(|r| r.value().clone())
    }

    pub fn scratch_value(&self, key: &str) -> Option<String> {
        self.scratch.get(key).map(|v| v.value().clone())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put_embedding(&self, kind: ModelKind, text: &str, vector: &[f32]) -> Result<()> {
        self.records.insert(
            kind.storage_key(text),
            StoredEmbedding {
                text: text.to_string(),
                vector: vector_to_bytes(vector),
            },
        );
        Ok(())
    }

    async fn knn(&self, kind: ModelKind, query: &[f32], k: usize) -> Result<SearchResults> {
        let query = ArrayView1::from(query);
        let mut hits = Vec::new();

        for entry in self.records.iter() {
            if !entry.key().starts_with(kind.key_prefix()) {
                continue;
            }
            let vector = bytes_to_vector(&entry.value().vector)?;
            if vector.len() != query.len() {
                return Err(Error::Store(format!(
                    "query has dimension {} but '{}' has {}",
                    query.len(),
                    entry.key(),
                    vector.len()
                )));
            }
            let distance = cosine_distance(query, ArrayView1::from(vector.as_slice()));
            hits.push(SearchHit {
                id: entry.key().clone(),
                text: entry.value().text.clone(),
                score: f64::from(distance),
            });
        }

        hits.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(k);

        Ok(SearchResults {
            total: hits.len() as u64,
            documents: hits,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn set_scratch(&self, key: &str, value: &str) -> Result<()> {
        self.scratch.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn snapshot(&self) -> Result<Option<BTreeMap<String, Vec<f32>>>> {
        let mut out = BTreeMap::new();
        for entry in self.records.iter() {
            out.insert(
                entry.value().text.clone(),
                bytes_to_vector(&entry.value().vector)?,
            );
        }
        Ok(Some(out))
    }

    async fn index_exists(&self, _kind: ModelKind) -> Result<bool> {
        Ok(true)
    }

    async fn ensure_index(&self, _kind: ModelKind) -> Result<bool> {
        Ok(false)
    }
}
