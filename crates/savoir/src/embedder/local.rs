//! On-device embedding provider backed by fastembed.
//!
//! Models are downloaded on first use from Hugging Face and cached; after
//! that, embeddings run entirely offline. ORT is bundled — no system
//! dependencies.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use savoir_core::embedding::Embedder;

use crate::config::EmbeddingConfig;

const DEFAULT_MODEL: &str = "all-minilm-l6-v2";

/// Local embedding provider.
///
/// Inference is synchronous ONNX execution, so each call is dispatched to
/// the blocking thread pool.
pub struct LocalEmbedder {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    model_name: String,
    dims: usize,
    max_tokens: usize,
}

impl LocalEmbedder {
    /// Initialize the model named in the configuration (downloading it if
    /// not cached). Blocking; call from the composition root at startup.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let fastembed_model = config_to_fastembed_model(&model_name)?;
        let dims = config.dims.unwrap_or(default_dims(&model_name));

        tracing::info!(model = %model_name, dims, "initializing local embedding model");

        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
        )
        .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name,
            dims,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();
        let dims = self.dims;

        let embedding = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().unwrap();
            let mut embeddings = model
                .embed(vec![text], None)
                .map_err(|e| anyhow!("Local embedding failed: {}", e))?;
            embeddings
                .pop()
                .ok_or_else(|| anyhow!("Local embedding returned no vector"))
        })
        .await??;

        if embedding.len() != dims {
            bail!(
                "Local embedding dimension mismatch: expected {}, got {}",
                dims,
                embedding.len()
            );
        }

        Ok(embedding)
    }
}

fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, all-minilm-l12-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
             multilingual-e5-small, multilingual-e5-base",
            other
        ),
    }
}

fn default_dims(name: &str) -> usize {
    match name {
        "all-minilm-l6-v2" | "all-minilm-l12-v2" => 384,
        "bge-small-en-v1.5" | "multilingual-e5-small" => 384,
        "bge-base-en-v1.5" | "multilingual-e5-base" => 768,
        _ => 384,
    }
}
