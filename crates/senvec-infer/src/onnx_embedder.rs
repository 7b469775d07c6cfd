//! ONNX-based sentence encoder.
//!
//! Loads a sentence-transformers ONNX export and its tokenizer, then produces
//! one float32 vector per input text. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;
    use std::time::Duration;

    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use senvec_core::{Error, ModelKind, Result};
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use crate::cache::QueryCache;
    use crate::embedder::{EmbedderBackend, EmbeddingResult};
    use crate::similarity::l2_normalize;

    /// Maximum sequence length for the model.
    const MAX_SEQ_LEN: usize = 512;

    fn inference_err(stage: &str, e: impl std::fmt::Display) -> Error {
        Error::Inference(format!("{}: {}", stage, e))
    }

    /// ONNX sentence encoder for one `ModelKind`.
    pub struct OnnxEmbedder {
        kind: ModelKind,
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        cache: QueryCache,
    }

    impl OnnxEmbedder {
        /// Load the model for `kind` from `model_root/<model id>/`.
        ///
        /// Expects:
        /// - `model.onnx`: the ONNX model file
        /// - `tokenizer.json`: the HuggingFace tokenizer
        pub fn load(
            model_root: &Path,
            kind: ModelKind,
            cache_size: usize,
            cache_ttl: Duration,
        ) -> Result<Self> {
            let model_dir = model_root.join(kind.model_id());
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(Error::ModelUnavailable(format!(
                    "model not found: {}",
                    model_path.display()
                )));
            }
            if !tokenizer_path.exists() {
                return Err(Error::ModelUnavailable(format!(
                    "tokenizer not found: {}",
                    tokenizer_path.display()
                )));
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime.so
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::ModelUnavailable(format!("session builder: {}", e)))?
                .with_intra_threads(2)
                .map_err(|e| Error::ModelUnavailable(format!("intra threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::ModelUnavailable(format!("load {}: {}", model_path.display(), e)))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::ModelUnavailable(format!("load tokenizer: {}", e)))?;

            info!(
                model = kind.model_id(),
                dim = kind.dimension(),
                "ONNX encoder loaded from {}",
                model_dir.display()
            );

            Ok(Self {
                kind,
                session: Mutex::new(session),
                tokenizer,
                cache: QueryCache::new(cache_size, cache_ttl),
            })
        }

        fn infer(&self, text: &str) -> Result<Array1<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| inference_err("tokenize", e))?;

            let seq_len = encoding.get_ids().len().min(MAX_SEQ_LEN);
            let input_ids = &encoding.get_ids()[..seq_len];
            let attention_mask = &encoding.get_attention_mask()[..seq_len];

            let ids_data: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
            let mask_data: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids_data))
                .map_err(|e| inference_err("ids tensor", e))?;
            let mask_tensor = Tensor::from_array(([1usize, seq_len], mask_data))
                .map_err(|e| inference_err("mask tensor", e))?;

            let mut session = self.session.lock();
            let outputs = if self.kind.uses_token_type_ids() {
                let type_ids_tensor = Tensor::from_array(([1usize, seq_len], vec![0i64; seq_len]))
                    .map_err(|e| inference_err("type_ids tensor", e))?;
                session.run(ort::inputs![ids_tensor, mask_tensor, type_ids_tensor])
            } else {
                session.run(ort::inputs![ids_tensor, mask_tensor])
            }
            .map_err(|e| inference_err("run", e))?;

            // Sentence-transformers exports emit either token embeddings
            // [1, seq_len, dim] that need pooling, or a pooled [1, dim].
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| inference_err("extract output", e))?;
            let shape_dims: Vec<i64> = shape.iter().copied().collect();

            let mut embedding = match shape_dims.as_slice() {
                [_, _, dim] => {
                    let dim = *dim as usize;
                    let mask_sum: f32 = attention_mask.iter().map(|&m| m as f32).sum();
                    if mask_sum < 1e-9 {
                        return Err(Error::Inference("empty attention mask".into()));
                    }
                    let mut pooled = Array1::<f32>::zeros(dim);
                    for (i, &m) in attention_mask.iter().enumerate() {
                        if m > 0 {
                            let row = &data[i * dim..(i + 1) * dim];
                            for (acc, &x) in pooled.iter_mut().zip(row) {
                                *acc += x;
                            }
                        }
                    }
                    pooled / mask_sum
                }
                [_, dim] => Array1::from_vec(data[..*dim as usize].to_vec()),
                other => {
                    return Err(Error::Inference(format!(
                        "unexpected output shape {:?}",
                        other
                    )))
                }
            };

            if self.kind.normalizes_output() {
                l2_normalize(&mut embedding);
            }
            Ok(embedding)
        }
    }

    impl EmbedderBackend for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<EmbeddingResult> {
            if let Some(cached) = self.cache.get(text) {
                debug!(model = self.kind.model_id(), "embedding cache hit");
                return Ok(EmbeddingResult {
                    embedding: cached,
                    cached: true,
                });
            }

            let embedding = self.infer(text)?;
            self.cache.put(text.to_string(), embedding.clone());

            Ok(EmbeddingResult {
                embedding,
                cached: false,
            })
        }

        fn model_id(&self) -> &str {
            self.kind.model_id()
        }

        fn dimension(&self) -> usize {
            self.kind.dimension()
        }

        fn is_available(&self) -> bool {
            true
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEmbedder;
