//! Concrete [`Embedder`] implementations.
//!
//! - [`http::HttpEmbedder`] — OpenAI-compatible embeddings API with retry
//!   and exponential backoff.
//! - [`local::LocalEmbedder`] — on-device fastembed models (feature
//!   `local-embeddings-fastembed`, enabled by default).
//!
//! [`create_embedder`] instantiates the provider selected in the
//! configuration.

pub mod http;
#[cfg(feature = "local-embeddings-fastembed")]
pub mod local;

use std::sync::Arc;

use anyhow::{bail, Result};

use savoir_core::embedding::Embedder;

use crate::config::EmbeddingConfig;

/// Create the configured [`Embedder`].
///
/// | Config value | Provider |
/// |--------------|----------|
/// | `"local"` | fastembed on-device models |
/// | `"openai"` | OpenAI-compatible embeddings API |
/// | `"disabled"` | error — nothing to embed with |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(http::HttpEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(local::LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embeddings require the 'local-embeddings-fastembed' feature"
        ),
        "disabled" => bail!("Embedding provider is disabled"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
