//! Core data models used throughout Savoir.
//!
//! These types represent the knowledge bases, chunks, search results, and
//! per-query configuration that flow through the processing and retrieval
//! pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance of a [`DocumentChunk`] within its source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Owning knowledge-base id.
    pub source_id: String,
    /// Name of the original document.
    pub source_name: String,
    /// 0-based position of the chunk within its source document.
    pub chunk_index: usize,
    /// Approximate byte offset of the chunk in the original text (best effort).
    pub start_char: usize,
    /// Approximate end offset in the original text (best effort).
    pub end_char: usize,
    pub created_at: DateTime<Utc>,
}

/// A unit of indexed text, embedded once during document processing and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub content: String,
    /// Fixed-length embedding vector; dimensionality is constant across all
    /// chunks of a knowledge base.
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Origin of a knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeBaseKind {
    /// Built by the user from uploaded or imported documents.
    Custom,
    /// Downloaded as a ready-made collection.
    Predefined,
}

impl KnowledgeBaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeBaseKind::Custom => "custom",
            KnowledgeBaseKind::Predefined => "predefined",
        }
    }
}

/// A named collection of chunks plus aggregate statistics.
///
/// Chunks are looked up by knowledge-base id at query time, not embedded in
/// this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: KnowledgeBaseKind,
    /// Display color, e.g. `hsl(210, 70%, 50%)`. Presentation only.
    pub color: String,
    pub total_documents: usize,
    /// Equals the number of persisted chunks whose `source_id` matches `id`.
    pub total_chunks: usize,
    /// Sum of the raw byte sizes of the source documents.
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `{name, content}` pair handed to the document processor by a source
/// (file upload, web import).
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub content: String,
}

/// A span of a retrieved chunk judged to have been used in a generated
/// answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// The cited sentence, verbatim from the chunk.
    pub text: String,
    /// Byte offset of the sentence within the chunk content.
    pub start_index: usize,
    pub end_index: usize,
    /// 0.9 for an exact phrase match, 0.6 for the word-overlap fallback.
    pub confidence: f32,
}

/// A retrieved chunk with its scores, produced per query and never persisted
/// on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    /// Raw cosine similarity against the query embedding.
    pub similarity: f32,
    /// Post-re-rank score, clamped to ≤ 1.
    pub relevance: f32,
    /// Populated by citation analysis after generation completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_in_response: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl SearchResult {
    pub fn new(chunk: DocumentChunk, similarity: f32) -> Self {
        Self {
            chunk,
            similarity,
            relevance: similarity,
            used_in_response: None,
            citations: None,
        }
    }
}

/// Segment boundary strategy for the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    Sentence,
    Paragraph,
    Character,
}

/// Chunking configuration, passed by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingOptions {
    /// Target chunk size, in characters.
    pub chunk_size: usize,
    /// Characters of the previous chunk replayed at the start of the next.
    pub chunk_overlap: usize,
    pub split_on: SplitStrategy,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
            split_on: SplitStrategy::Sentence,
            min_chunk_size: 100,
            max_chunk_size: 1000,
        }
    }
}

/// Per-query retrieval configuration, produced fresh by the query analyzer
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub enabled: bool,
    /// Restrict the search to one knowledge base; `None` searches globally.
    pub selected_knowledge_base: Option<String>,
    pub similarity_threshold: f32,
    pub max_results: usize,
    pub use_reranking: bool,
    /// Character budget for the injected context block.
    pub context_length: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            selected_knowledge_base: None,
            similarity_threshold: 0.38,
            max_results: 5,
            use_reranking: true,
            context_length: 3000,
        }
    }
}

/// Role tag of a message handed to the generation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of the ordered list consumed by the generation engine. The
/// core only builds these lists; it does not manage the engine lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
