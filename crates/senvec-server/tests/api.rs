//! Router-level tests: requests go through the full axum stack against the
//! in-memory store and a deterministic stand-in encoder.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ndarray::Array1;
use senvec_core::{Error, ModelKind, Result};
use senvec_infer::{EmbedderBackend, EmbeddingResult, Encoders, UnavailableEmbedder};
use senvec_server::startup::{check_indexes, create_indexes, verify_indexes};
use senvec_server::{build_router, AppState};
use senvec_store::{MemoryStore, SearchResults, VectorStore};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Letter-frequency encoder: equal texts give equal vectors, and texts with
/// similar letters land close together.
struct LetterEncoder {
    kind: ModelKind,
    calls: AtomicUsize,
}

impl LetterEncoder {
    fn new(kind: ModelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbedderBackend for LetterEncoder {
    fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = Array1::<f32>::zeros(26);
        for c in text.to_ascii_lowercase().bytes() {
            if c.is_ascii_lowercase() {
                v[(c - b'a') as usize] += 1.0;
            }
        }
        Ok(EmbeddingResult {
            embedding: v,
            cached: false,
        })
    }

    fn model_id(&self) -> &str {
        self.kind.model_id()
    }

    fn dimension(&self) -> usize {
        26
    }

    fn is_available(&self) -> bool {
        true
    }
}

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
    paraphrase: Arc<LetterEncoder>,
    qa: Arc<LetterEncoder>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let paraphrase = LetterEncoder::new(ModelKind::Paraphrase);
    let qa = LetterEncoder::new(ModelKind::Qa);
    let encoders = Encoders::new(paraphrase.clone(), qa.clone());
    let state = AppState::new(encoders, store.clone());
    Harness {
        app: build_router(Arc::new(state)),
        store,
        paraphrase,
        qa,
    }
}

fn app_with(encoders: Encoders, store: Arc<dyn VectorStore>) -> Router {
    build_router(Arc::new(AppState::new(encoders, store)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_and_models() {
    let h = harness();

    let (status, body) = send(&h.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "API running" }));

    let (status, body) = send(&h.app, "GET", "/models", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "available_models": [
                "paraphrase-multilingual-mpnet-base-v2",
                "multi-qa-MiniLM-L6-cos-v1"
            ]
        })
    );
}

#[tokio::test]
async fn test_embed_question_uses_qa_model() {
    let h = harness();
    let (status, body) = send(&h.app, "POST", "/embed", Some(json!({ "text": "What is AI?" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "What is AI?");
    assert_eq!(body["model_used"], "multi-qa-MiniLM-L6-cos-v1");
    assert_eq!(body["vector"].as_array().unwrap().len(), 26);
    assert_eq!(h.qa.calls(), 1);
    assert_eq!(h.paraphrase.calls(), 0);
    assert!(h.store.get("qa:What is AI?").is_some());
}

#[tokio::test]
async fn test_embed_statement_uses_paraphrase_model() {
    let h = harness();
    let (status, body) =
        send(&h.app, "POST", "/embed", Some(json!({ "text": "  AI is useful.  " }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "AI is useful.");
    assert_eq!(body["model_used"], "paraphrase-multilingual-mpnet-base-v2");
    assert_eq!(h.paraphrase.calls(), 1);
    assert_eq!(h.qa.calls(), 0);
    assert!(h.store.get("para:AI is useful.").is_some());
}

#[tokio::test]
async fn test_embed_twice_overwrites() {
    let h = harness();
    for _ in 0..2 {
        let (status, _) = send(&h.app, "POST", "/embed", Some(json!({ "text": "AI is useful." }))).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn test_embed_rejects_blank_text_without_side_effects() {
    let h = harness();
    for text in ["", "   ", "\n\t"] {
        let (status, body) = send(&h.app, "POST", "/embed", Some(json!({ "text": text }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "detail": "Text cannot be empty" }));
    }
    assert_eq!(h.paraphrase.calls() + h.qa.calls(), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_embed_missing_field_is_client_error() {
    let h = harness();
    let (status, _) = send(&h.app, "POST", "/embed", Some(json!({ "txt": "hi" }))).await;
    assert!(status.is_client_error());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_embed_unavailable_model_is_server_error() {
    let store = Arc::new(MemoryStore::new());
    let encoders = Encoders::new(
        Arc::new(UnavailableEmbedder::new(ModelKind::Paraphrase, "model.onnx missing")),
        Arc::new(UnavailableEmbedder::new(ModelKind::Qa, "model.onnx missing")),
    );
    let app = app_with(encoders, store.clone());

    let (status, body) = send(&app, "POST", "/embed", Some(json!({ "text": "AI is useful." }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "detail": "Vector generation failed" }));
    assert!(store.is_empty());

    let (status, body) = send(
        &app,
        "POST",
        "/compare",
        Some(json!({ "text1": "a", "text2": "b" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "detail": "Comparison failed" }));
}

#[tokio::test]
async fn test_compare_identical_texts() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        "POST",
        "/compare",
        Some(json!({ "text1": "Rust is fast.", "text2": " Rust is fast. " })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text1"], "Rust is fast.");
    assert_eq!(body["text2"], "Rust is fast.");
    assert_eq!(body["similarity"].as_f64().unwrap(), 1.0);
}

#[tokio::test]
async fn test_compare_always_uses_paraphrase_model() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        "POST",
        "/compare",
        Some(json!({ "text1": "Is this fine?", "text2": "This is fine." })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.paraphrase.calls(), 2);
    assert_eq!(h.qa.calls(), 0);

    let similarity = body["similarity"].as_f64().unwrap();
    assert!(similarity > 0.9 && similarity <= 1.0);
    // Three decimals at most.
    assert_eq!((similarity * 1000.0).round() / 1000.0, similarity);
    // Comparison never persists.
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_compare_rejects_either_blank_text() {
    let h = harness();
    for body in [
        json!({ "text1": " ", "text2": "fine" }),
        json!({ "text1": "fine", "text2": "" }),
    ] {
        let (status, resp) = send(&h.app, "POST", "/compare", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({ "detail": "Texts cannot be empty" }));
    }
    assert_eq!(h.paraphrase.calls() + h.qa.calls(), 0);
}

#[tokio::test]
async fn test_similarity_search_returns_nearest_in_same_model() {
    let h = harness();
    for text in ["What is AI?", "What is Rust?", "Why is the sky blue?", "Who won?", "AI is useful."] {
        send(&h.app, "POST", "/embed", Some(json!({ "text": text }))).await;
    }

    let (status, body) = send(
        &h.app,
        "POST",
        "/similarity_search",
        Some(json!({ "text": "what is ai?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results: SearchResults = serde_json::from_value(body["results"].clone()).unwrap();
    assert_eq!(results.total, 3);
    assert_eq!(results.documents.len(), 3);
    assert_eq!(results.documents[0].id, "qa:What is AI?");
    assert_eq!(results.documents[0].text, "What is AI?");
    assert!(results.documents[0].score < 1e-6);
    assert!(results.documents.iter().all(|d| d.id.starts_with("qa:")));
}

#[tokio::test]
async fn test_similarity_search_rejects_blank_text() {
    let h = harness();
    let (status, body) = send(&h.app, "POST", "/similarity_search", Some(json!({ "text": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "detail": "Text cannot be empty" }));
    assert_eq!(h.qa.calls() + h.paraphrase.calls(), 0);
}

/// Store whose indexes were never provisioned.
struct UnprovisionedStore;

#[async_trait]
impl VectorStore for UnprovisionedStore {
    fn backend_name(&self) -> &'static str {
        "unprovisioned"
    }

    async fn put_embedding(&self, _kind: ModelKind, _text: &str, _vector: &[f32]) -> Result<()> {
        Err(Error::Store("connection refused".into()))
    }

    async fn knn(&self, kind: ModelKind, _query: &[f32], _k: usize) -> Result<SearchResults> {
        Err(Error::IndexNotFound(kind.index_name().to_string()))
    }

    async fn ping(&self) -> Result<()> {
        Err(Error::Store("connection refused".into()))
    }

    async fn set_scratch(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::Timeout(5000))
    }

    async fn snapshot(&self) -> Result<Option<BTreeMap<String, Vec<f32>>>> {
        Ok(None)
    }

    async fn index_exists(&self, _kind: ModelKind) -> Result<bool> {
        Ok(false)
    }

    async fn ensure_index(&self, _kind: ModelKind) -> Result<bool> {
        Err(Error::Store("read only".into()))
    }
}

fn unprovisioned_app() -> Router {
    let encoders = Encoders::new(
        LetterEncoder::new(ModelKind::Paraphrase),
        LetterEncoder::new(ModelKind::Qa),
    );
    app_with(encoders, Arc::new(UnprovisionedStore))
}

#[tokio::test]
async fn test_similarity_search_missing_index_is_explicit_failure() {
    let app = unprovisioned_app();
    let (status, body) = send(
        &app,
        "POST",
        "/similarity_search",
        Some(json!({ "text": "What is AI?" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "detail": "Search index 'qa_idx' does not exist" }));
}

#[tokio::test]
async fn test_store_failures_surface_as_unavailable() {
    let app = unprovisioned_app();

    let (status, body) = send(&app, "POST", "/embed", Some(json!({ "text": "AI is useful." }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "detail": "Vector store unavailable" }));

    let (status, body) = send(&app, "GET", "/redis-health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "redis_alive": false }));

    let (status, _) = send(&app, "POST", "/redis-test", Some(json!({ "text": "k" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&app, "GET", "/memory", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_memory_lists_embeddings_by_text() {
    let h = harness();
    send(&h.app, "POST", "/embed", Some(json!({ "text": "What is AI?" }))).await;
    send(&h.app, "POST", "/embed", Some(json!({ "text": "AI is useful." }))).await;

    let (status, body) = send(&h.app, "GET", "/memory", None).await;
    assert_eq!(status, StatusCode::OK);
    let stored = body["stored_embeddings"].as_object().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored["What is AI?"].as_array().unwrap().len(), 26);
    assert!(stored.contains_key("AI is useful."));
}

#[tokio::test]
async fn test_store_diagnostics() {
    let h = harness();

    let (status, body) = send(&h.app, "GET", "/redis-health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "redis_alive": true }));

    let (status, body) = send(&h.app, "POST", "/redis-test", Some(json!({ "text": "hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stored 'hello' in Redis");
    assert_eq!(h.store.scratch_value("hello").as_deref(), Some("working"));
    assert!(h.store.is_empty());
}

// ---------------------------------------------------------------
// Startup index provisioning
// ---------------------------------------------------------------

/// Store on a Redis without the search module: FT.INFO itself fails for
/// the paraphrase index.
struct NoSearchModuleStore;

#[async_trait]
impl VectorStore for NoSearchModuleStore {
    fn backend_name(&self) -> &'static str {
        "no-search-module"
    }

    async fn put_embedding(&self, _kind: ModelKind, _text: &str, _vector: &[f32]) -> Result<()> {
        Ok(())
    }

    async fn knn(&self, kind: ModelKind, _query: &[f32], _k: usize) -> Result<SearchResults> {
        Err(Error::IndexNotFound(kind.index_name().to_string()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn set_scratch(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn snapshot(&self) -> Result<Option<BTreeMap<String, Vec<f32>>>> {
        Ok(None)
    }

    async fn index_exists(&self, kind: ModelKind) -> Result<bool> {
        match kind {
            ModelKind::Paraphrase => Err(Error::Store("unknown command 'FT.INFO'".into())),
            ModelKind::Qa => Ok(true),
        }
    }

    async fn ensure_index(&self, _kind: ModelKind) -> Result<bool> {
        Err(Error::Store("unknown command 'FT.INFO'".into()))
    }
}

#[tokio::test]
async fn test_check_indexes_reports_missing() {
    assert!(check_indexes(&MemoryStore::new()).await.unwrap().is_empty());
    assert_eq!(
        check_indexes(&UnprovisionedStore).await.unwrap(),
        vec![ModelKind::Paraphrase, ModelKind::Qa]
    );
}

#[tokio::test]
async fn test_check_indexes_propagates_lookup_failure() {
    let err = check_indexes(&NoSearchModuleStore).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}

#[tokio::test]
async fn test_create_indexes() {
    // The memory backend needs no index, so nothing is created.
    assert!(create_indexes(&MemoryStore::new()).await.unwrap().is_empty());

    let err = create_indexes(&UnprovisionedStore).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}

#[tokio::test]
async fn test_verify_indexes_tolerates_lookup_failure() {
    assert!(verify_indexes(&MemoryStore::new()).await.is_empty());
    assert_eq!(
        verify_indexes(&UnprovisionedStore).await,
        vec![ModelKind::Paraphrase, ModelKind::Qa]
    );
    assert_eq!(
        verify_indexes(&NoSearchModuleStore).await,
        vec![ModelKind::Paraphrase]
    );

    // The server still answers everything that does not need an index.
    let encoders = Encoders::new(
        LetterEncoder::new(ModelKind::Paraphrase),
        LetterEncoder::new(ModelKind::Qa),
    );
    let app = app_with(encoders, Arc::new(NoSearchModuleStore));

    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "POST", "/embed", Some(json!({ "text": "AI is useful." }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_used"], "paraphrase-multilingual-mpnet-base-v2");
}
