//! Embedder trait, embedding cache, and vector utilities.
//!
//! The [`Embedder`] trait abstracts the external embedding runtime; concrete
//! implementations (local fastembed, HTTP APIs) live in the `savoir` app
//! crate. [`EmbeddingService`] wraps the active embedder with a two-level
//! memoization map — model id → text → vector — so the same text is never
//! embedded twice under one model, and entries can never leak across a model
//! switch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::models::DocumentChunk;

/// Approximate characters-per-token ratio used to truncate embedder input.
const CHARS_PER_TOKEN: usize = 4;

/// An external embedding runtime.
///
/// Implementations must be deterministic for a given (model, text) pair.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier of the underlying model (cache key component).
    fn model_id(&self) -> &str;
    /// Embedding vector dimensionality (e.g. 384).
    fn dims(&self) -> usize;
    /// Token budget of the model; longer inputs are truncated by the service.
    fn max_tokens(&self) -> usize;
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[derive(Default)]
struct ServiceState {
    active: Option<Arc<dyn Embedder>>,
    /// model id → input text → vector.
    cache: HashMap<String, HashMap<String, Vec<f32>>>,
}

/// Memoizing front of the embedding runtime.
///
/// Process-wide, single-owner mutable state: only this service touches the
/// cache, and the cache is cleared atomically whenever the active model
/// changes.
pub struct EmbeddingService {
    state: RwLock<ServiceState>,
}

impl EmbeddingService {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ServiceState::default()),
        }
    }

    /// Activate an embedder. Switching to a different model id clears the
    /// cache; re-setting the same model keeps it.
    pub fn set_model(&self, embedder: Arc<dyn Embedder>) {
        let mut state = self.state.write().unwrap();
        let switched = state
            .active
            .as_ref()
            .map(|current| current.model_id() != embedder.model_id())
            .unwrap_or(false);
        if switched {
            state.cache.clear();
        }
        state.active = Some(embedder);
    }

    /// Deactivate the embedder and drop the cache.
    pub fn unload_model(&self) {
        let mut state = self.state.write().unwrap();
        state.active = None;
        state.cache.clear();
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().unwrap().active.is_some()
    }

    /// Id of the active model, if any.
    pub fn model_id(&self) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .active
            .as_ref()
            .map(|e| e.model_id().to_string())
    }

    /// Number of cached embeddings across all models.
    pub fn cache_len(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .cache
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn clear_cache(&self) {
        self.state.write().unwrap().cache.clear();
    }

    /// Embed `text` with the active model, consulting the cache first.
    ///
    /// Input is trimmed and truncated to the model's token budget
    /// (approximated as `max_tokens × 4` characters) before embedding —
    /// callers must not assume the full text was embedded.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = {
            let state = self.state.read().unwrap();
            match &state.active {
                Some(embedder) => Arc::clone(embedder),
                None => return Err(RagError::ModelNotLoaded),
            }
        };

        let cleaned = text.trim();
        let truncated = head_chars(cleaned, embedder.max_tokens() * CHARS_PER_TOKEN);
        let model = embedder.model_id().to_string();

        if let Some(hit) = self
            .state
            .read()
            .unwrap()
            .cache
            .get(&model)
            .and_then(|entries| entries.get(truncated))
        {
            return Ok(hit.clone());
        }

        let vector = embedder
            .embed(truncated)
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        self.state
            .write()
            .unwrap()
            .cache
            .entry(model)
            .or_default()
            .insert(truncated.to_string(), vector.clone());

        Ok(vector)
    }

    /// Embed a batch of texts sequentially, reporting `(done, total)` after
    /// each item.
    pub async fn embed_batch(
        &self,
        texts: &[String],
        on_progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            vectors.push(self.embed(text).await?);
            if let Some(report) = on_progress {
                report(i + 1, texts.len());
            }
        }
        Ok(vectors)
    }
}

impl Default for EmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Vectors of different lengths indicate
/// a model-mixing bug upstream and fail with
/// [`RagError::DimensionMismatch`]; a zero-magnitude vector yields `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}

/// Rank `chunks` against a query vector.
///
/// Returns `(index, similarity)` pairs for every chunk at or above
/// `threshold`, sorted descending by similarity (ties keep input order) and
/// truncated to `max_results`.
pub fn find_similar(
    query: &[f32],
    chunks: &[DocumentChunk],
    threshold: f32,
    max_results: usize,
) -> Result<Vec<(usize, f32)>> {
    let mut scored = Vec::with_capacity(chunks.len());
    for (idx, chunk) in chunks.iter().enumerate() {
        let similarity = cosine_similarity(query, &chunk.embedding)?;
        if similarity >= threshold {
            scored.push((idx, similarity));
        }
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(max_results);
    Ok(scored)
}

/// Encode a float vector as a BLOB (little-endian f32 bytes) for storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Reverses [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// First `n` characters of `s`, on a UTF-8 boundary.
fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
