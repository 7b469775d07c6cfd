//! senvec store: where embeddings are persisted and searched.
//!
//! `VectorStore` is the seam between request handlers and the backing
//! store. `RedisStore` talks to a RediSearch-enabled Redis. `MemoryStore`
//! keeps everything in the process and runs brute-force KNN.

pub mod embedding;
pub mod memory;
pub mod redis_store;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use senvec_core::{ModelKind, Result, StoreBackend};

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use types::*;

/// Neighbors returned by a similarity search.
pub const SEARCH_TOP_K: usize = 3;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short name for logs and diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Write `{text, vector}` under `kind`'s prefix, replacing any previous
    /// record for the same text.
    async fn put_embedding(&self, kind: ModelKind, text: &str, vector: &[f32]) -> Result<()>;

    /// Nearest neighbors of `query` among records of `kind`.
    async fn knn(&self, kind: ModelKind, query: &[f32], k: usize) -> Result<SearchResults>;

    /// Liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Store a plain string value; used by the diagnostics endpoint only.
    async fn set_scratch(&self, key: &str, value: &str) -> Result<()>;

    /// Every stored embedding keyed by its text, when the backend can list
    /// them cheaply. `None` means listing is not supported.
    async fn snapshot(&self) -> Result<Option<BTreeMap<String, Vec<f32>>>>;

    async fn index_exists(&self, kind: ModelKind) -> Result<bool>;

    /// Create the search index for `kind` if it is missing. Returns whether
    /// an index was created.
    async fn ensure_index(&self, kind: ModelKind) -> Result<bool>;

    /// Release connections. Called once on server shutdown; later calls
    /// that need the backend fail with `Error::Store`. Backends without
    /// connections keep the default no-op.
    async fn shutdown(&self) {}
}

/// Connect the configured backend.
pub async fn connect(backend: &StoreBackend, timeout: Duration) -> Result<Arc<dyn VectorStore>> {
    match backend {
        StoreBackend::Redis { url } => Ok(Arc::new(RedisStore::connect(url, timeout).await?)),
        StoreBackend::Memory => {
            tracing::info!("Using in-memory vector store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
