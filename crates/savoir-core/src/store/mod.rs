//! Storage abstraction for knowledge bases and their chunks.
//!
//! The [`KnowledgeStore`] trait defines every storage operation the pipeline
//! needs, enabling pluggable backends (SQLite, in-memory, future
//! WASM-compatible stores). The store is the single source of truth for
//! persisted state; the pipeline keeps no second authoritative copy.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DocumentChunk, KnowledgeBase};

/// Abstract storage backend.
///
/// All operations are async (via `async-trait`) and may fail with a
/// storage-unavailable error, which the pipeline propagates — an empty
/// result is reserved for "no matches".
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Insert or update a knowledge-base record.
    async fn save_knowledge_base(&self, kb: &KnowledgeBase) -> Result<()>;

    /// Fetch one knowledge base by id.
    async fn get_knowledge_base(&self, id: &str) -> Result<Option<KnowledgeBase>>;

    /// List every stored knowledge base.
    async fn all_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>>;

    /// Delete a knowledge base and all of its chunks (cascade).
    async fn delete_knowledge_base(&self, id: &str) -> Result<()>;

    /// Persist a batch of chunks.
    async fn save_chunks(&self, chunks: &[DocumentChunk]) -> Result<()>;

    /// All chunks belonging to a knowledge base, in insertion order.
    async fn chunks_for_knowledge_base(&self, kb_id: &str) -> Result<Vec<DocumentChunk>>;
}
