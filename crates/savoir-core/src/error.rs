//! Error taxonomy of the retrieval pipeline.
//!
//! Chunk-level embedding failures are absorbed (logged and skipped) by the
//! document processor; everything else propagates to the caller. Storage
//! backends report `anyhow::Error` through the [`KnowledgeStore`] trait and
//! are wrapped into [`RagError::Storage`] at the pipeline boundary.
//!
//! [`KnowledgeStore`]: crate::store::KnowledgeStore

use thiserror::Error;

/// Error type for all pipeline operations.
#[derive(Error, Debug)]
pub enum RagError {
    /// Document rejected before processing (empty, too short, too large).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Chunking produced zero usable chunks; aborts that document.
    #[error("no usable chunks produced from '{source_name}'")]
    EmptyChunkResult { source_name: String },

    /// The embedding runtime failed for a given text.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Embedding requested while no model is active.
    #[error("no embedding model is loaded")]
    ModelNotLoaded,

    /// Cosine similarity over vectors of different lengths; indicates a
    /// model-mixing bug upstream.
    #[error("embedding dimension mismatch: {left} != {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// Storage backend failure, propagated to the caller.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;
