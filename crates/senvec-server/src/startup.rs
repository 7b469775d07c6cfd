//! Search index provisioning run before the listener starts.

use senvec_core::{ModelKind, Result};
use senvec_store::VectorStore;
use tracing::{info, warn};

/// Check every model's search index. Returns the kinds whose index is
/// missing; a failed lookup is returned as an error.
pub async fn check_indexes(store: &dyn VectorStore) -> Result<Vec<ModelKind>> {
    let mut missing = Vec::new();
    for kind in ModelKind::ALL {
        if store.index_exists(kind).await? {
            info!(index = kind.index_name(), "Search index present");
        } else {
            warn!(
                index = kind.index_name(),
                prefix = kind.key_prefix(),
                dim = kind.dimension(),
                "Search index missing; similarity search for this model will fail"
            );
            missing.push(kind);
        }
    }
    Ok(missing)
}

/// Startup variant of [`check_indexes`]: a lookup failure is logged and
/// the kind counted as unverified, so the server still comes up for the
/// endpoints that never touch an index.
pub async fn verify_indexes(store: &dyn VectorStore) -> Vec<ModelKind> {
    let mut unverified = Vec::new();
    for kind in ModelKind::ALL {
        match store.index_exists(kind).await {
            Ok(true) => info!(index = kind.index_name(), "Search index present"),
            Ok(false) => {
                warn!(
                    index = kind.index_name(),
                    prefix = kind.key_prefix(),
                    dim = kind.dimension(),
                    "Search index missing; similarity search for this model will fail"
                );
                unverified.push(kind);
            }
            Err(e) => {
                warn!(
                    index = kind.index_name(),
                    backend = store.backend_name(),
                    "Could not check search index: {}",
                    e
                );
                unverified.push(kind);
            }
        }
    }
    unverified
}

/// Create every missing search index. Returns the kinds that were created.
pub async fn create_indexes(store: &dyn VectorStore) -> Result<Vec<ModelKind>> {
    let mut created = Vec::new();
    for kind in ModelKind::ALL {
        if store.ensure_index(kind).await? {
            created.push(kind);
        } else {
            info!(index = kind.index_name(), "Search index already exists");
        }
    }
    Ok(created)
}
