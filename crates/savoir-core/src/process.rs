//! Document processing pipeline: chunk → embed → persist.
//!
//! [`DocumentProcessor`] orchestrates the chunker, the embedding service,
//! and the knowledge store to turn raw documents into a persisted knowledge
//! base. It is an explicitly constructed service object: the application's
//! composition root owns it and injects its collaborators.
//!
//! Failure policy: a chunk whose embedding fails is logged and skipped —
//! partial success is expected at this layer. Document- and
//! knowledge-base-level failures propagate, after a best-effort deletion of
//! the partially created knowledge base.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::chunk::chunk_text;
use crate::embedding::EmbeddingService;
use crate::error::{RagError, Result};
use crate::models::{
    ChunkMetadata, ChunkingOptions, DocumentChunk, KnowledgeBase, KnowledgeBaseKind,
    SourceDocument,
};
use crate::store::KnowledgeStore;

/// Maximum accepted document size, in bytes.
const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Minimum accepted document size, in characters.
const MIN_DOCUMENT_CHARS: usize = 100;

/// Characters of a chunk used to locate it in the original text.
const LOCATE_PROBE_CHARS: usize = 50;

/// Progress callback: percentage in `[0, 100]` plus a stage description.
/// The percentage increases monotonically across stages.
pub type ProgressFn<'a> = &'a (dyn Fn(f32, &str) + Send + Sync);

/// Turns raw documents into persisted, embedded chunks.
pub struct DocumentProcessor {
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn KnowledgeStore>,
}

impl DocumentProcessor {
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<dyn KnowledgeStore>) -> Self {
        Self { embeddings, store }
    }

    /// Reject documents the pipeline cannot meaningfully index.
    pub fn validate_document(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(RagError::InvalidDocument("le document est vide".into()));
        }
        if content.chars().count() < MIN_DOCUMENT_CHARS {
            return Err(RagError::InvalidDocument(format!(
                "le document est trop court (minimum {MIN_DOCUMENT_CHARS} caractères)"
            )));
        }
        if content.len() > MAX_DOCUMENT_BYTES {
            return Err(RagError::InvalidDocument(
                "le document est trop volumineux (maximum 10 Mo)".into(),
            ));
        }
        Ok(())
    }

    /// Rough chunk count for a document, for UI estimates.
    pub fn estimate_chunks(content: &str, options: &ChunkingOptions) -> usize {
        let chars = content.trim().chars().count();
        chars.div_ceil(options.chunk_size)
    }

    /// Chunk, embed, and persist one document into `knowledge_base_id`.
    ///
    /// Returns the successfully embedded chunks, in source order. Chunks
    /// whose embedding fails are logged and skipped; zero usable chunks is
    /// an [`RagError::EmptyChunkResult`].
    pub async fn process_document(
        &self,
        content: &str,
        source_name: &str,
        knowledge_base_id: &str,
        options: &ChunkingOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<DocumentChunk>> {
        report(on_progress, 0.0, "Découpage du texte");

        let pieces = chunk_text(content, options);
        if pieces.is_empty() {
            return Err(RagError::EmptyChunkResult {
                source_name: source_name.to_string(),
            });
        }

        report(on_progress, 20.0, "Génération des embeddings");

        let total = pieces.len();
        let mut chunks = Vec::with_capacity(total);
        for (i, piece) in pieces.into_iter().enumerate() {
            match self.embeddings.embed(&piece).await {
                Ok(embedding) => {
                    let (start_char, end_char) = locate_span(content, &piece);
                    chunks.push(DocumentChunk {
                        id: Uuid::new_v4().to_string(),
                        content: piece,
                        embedding,
                        metadata: ChunkMetadata {
                            source_id: knowledge_base_id.to_string(),
                            source_name: source_name.to_string(),
                            chunk_index: i,
                            start_char,
                            end_char,
                            created_at: Utc::now(),
                        },
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        chunk = i,
                        source = source_name,
                        error = %err,
                        "embedding failed, skipping chunk"
                    );
                }
            }
            let percent = 20.0 + ((i + 1) as f32 / total as f32) * 70.0;
            report(on_progress, percent, &format!("Embedding {}/{}", i + 1, total));
        }

        report(on_progress, 90.0, "Sauvegarde");
        self.store
            .save_chunks(&chunks)
            .await
            .map_err(RagError::Storage)?;
        report(on_progress, 100.0, "Terminé");

        Ok(chunks)
    }

    /// Create a knowledge base from a set of documents.
    ///
    /// Documents are processed sequentially. On any unrecoverable error the
    /// partially created knowledge base is deleted best-effort before the
    /// error is re-raised; cleanup failures are logged, not escalated.
    /// Name and document-list validation is the caller's responsibility.
    pub async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
        documents: &[SourceDocument],
        options: &ChunkingOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<KnowledgeBase> {
        let kb_id = Uuid::new_v4().to_string();

        match self
            .build_knowledge_base(&kb_id, name, description, documents, options, on_progress)
            .await
        {
            Ok(kb) => Ok(kb),
            Err(err) => {
                if let Err(cleanup_err) = self.store.delete_knowledge_base(&kb_id).await {
                    tracing::warn!(
                        knowledge_base = %kb_id,
                        error = %cleanup_err,
                        "cleanup of partially created knowledge base failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn build_knowledge_base(
        &self,
        kb_id: &str,
        name: &str,
        description: &str,
        documents: &[SourceDocument],
        options: &ChunkingOptions,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<KnowledgeBase> {
        report(on_progress, 0.0, "Initialisation");

        let mut total_chunks = 0usize;
        let mut size_bytes = 0u64;
        let doc_count = documents.len().max(1);

        for (index, document) in documents.iter().enumerate() {
            let base = (index as f32 / doc_count as f32) * 90.0;
            let span = 90.0 / doc_count as f32;
            let forward = move |percent: f32, stage: &str| {
                if let Some(callback) = on_progress {
                    callback(base + percent / 100.0 * span, stage);
                }
            };

            let chunks = self
                .process_document(
                    &document.content,
                    &document.name,
                    kb_id,
                    options,
                    Some(&forward),
                )
                .await?;

            total_chunks += chunks.len();
            size_bytes += document.content.len() as u64;
        }

        let now = Utc::now();
        let kb = KnowledgeBase {
            id: kb_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            kind: KnowledgeBaseKind::Custom,
            color: display_color(kb_id),
            total_documents: documents.len(),
            total_chunks,
            size_bytes,
            created_at: now,
            updated_at: now,
        };

        report(on_progress, 95.0, "Sauvegarde de la base de connaissances");
        self.store
            .save_knowledge_base(&kb)
            .await
            .map_err(RagError::Storage)?;
        report(on_progress, 100.0, "Terminé");

        Ok(kb)
    }
}

fn report(on_progress: Option<ProgressFn<'_>>, percent: f32, stage: &str) {
    if let Some(callback) = on_progress {
        callback(percent, stage);
    }
}

/// Approximate the chunk's span in the original text by locating its first
/// characters. Best effort: normalization may have altered the text, in
/// which case the span is clamped to the start.
fn locate_span(original: &str, chunk: &str) -> (usize, usize) {
    let probe = head_chars(chunk, LOCATE_PROBE_CHARS);
    match original.find(probe) {
        Some(start) => (start, (start + chunk.len()).min(original.len())),
        None => (0, chunk.len().min(original.len())),
    }
}

/// Display hue derived from the knowledge base id — stable per base,
/// uniformly spread across the wheel.
fn display_color(id: &str) -> String {
    let hue = id
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
        % 360;
    format!("hsl({hue}, 70%, 50%)")
}

/// First `n` characters of `s`, on a UTF-8 boundary.
fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Deterministic embedder; fails on texts containing "panne".
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn model_id(&self) -> &str {
            "stub"
        }
        fn dims(&self) -> usize {
            4
        }
        fn max_tokens(&self) -> usize {
            512
        }
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            if text.contains("panne") {
                anyhow::bail!("simulated embedding failure");
            }
            Ok(vec![text.len() as f32, 1.0, 0.0, 0.0])
        }
    }

    fn processor() -> (DocumentProcessor, Arc<InMemoryStore>) {
        let embeddings = Arc::new(EmbeddingService::new());
        embeddings.set_model(Arc::new(StubEmbedder));
        let store = Arc::new(InMemoryStore::new());
        (
            DocumentProcessor::new(embeddings, store.clone()),
            store,
        )
    }

    fn paragraph(word: &str) -> String {
        format!("{} {}", word, "phrase de remplissage pour le test ".repeat(5))
    }

    fn doc(name: &str, paragraphs: &[&str]) -> SourceDocument {
        SourceDocument {
            name: name.to_string(),
            content: paragraphs
                .iter()
                .map(|w| paragraph(w))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }

    #[test]
    fn validate_document_rejects_bad_input() {
        assert!(matches!(
            DocumentProcessor::validate_document("   "),
            Err(RagError::InvalidDocument(_))
        ));
        assert!(matches!(
            DocumentProcessor::validate_document("trop court"),
            Err(RagError::InvalidDocument(_))
        ));
        assert!(DocumentProcessor::validate_document(&"a".repeat(200)).is_ok());
    }

    #[test]
    fn estimate_chunks_rounds_up() {
        let options = ChunkingOptions::default();
        assert_eq!(
            DocumentProcessor::estimate_chunks(&"a".repeat(1200), &options),
            3
        );
        assert_eq!(DocumentProcessor::estimate_chunks("", &options), 0);
    }

    #[tokio::test]
    async fn process_document_persists_ordered_chunks() {
        let (processor, store) = processor();
        let document = doc("climat.txt", &["alpha", "beta", "gamma"]);
        let options = ChunkingOptions {
            chunk_size: 150,
            chunk_overlap: 0,
            split_on: crate::models::SplitStrategy::Paragraph,
            min_chunk_size: 50,
            max_chunk_size: 400,
        };

        let chunks = processor
            .process_document(&document.content, "climat.txt", "kb1", &options, None)
            .await
            .unwrap();

        assert!(!chunks.is_empty());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.source_id, "kb1");
            assert_eq!(chunk.embedding.len(), 4);
        }

        let persisted = store.chunks_for_knowledge_base("kb1").await.unwrap();
        assert_eq!(persisted.len(), chunks.len());
    }

    #[tokio::test]
    async fn empty_document_is_an_error() {
        let (processor, _store) = processor();
        let err = processor
            .process_document("", "vide.txt", "kb1", &ChunkingOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyChunkResult { .. }));
    }

    #[tokio::test]
    async fn failing_chunk_is_skipped_not_fatal() {
        let (processor, _store) = processor();
        let document = doc("mixte.txt", &["alpha", "panne", "gamma"]);
        let options = ChunkingOptions {
            chunk_size: 150,
            chunk_overlap: 0,
            split_on: crate::models::SplitStrategy::Paragraph,
            min_chunk_size: 50,
            max_chunk_size: 400,
        };

        let chunks = processor
            .process_document(&document.content, "mixte.txt", "kb1", &options, None)
            .await
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.content.contains("panne")));
    }

    #[tokio::test]
    async fn create_knowledge_base_aggregates_stats() {
        let (processor, store) = processor();
        let documents = vec![
            doc("un.txt", &["alpha", "beta"]),
            doc("deux.txt", &["gamma", "delta"]),
        ];
        let options = ChunkingOptions {
            chunk_size: 150,
            chunk_overlap: 0,
            split_on: crate::models::SplitStrategy::Paragraph,
            min_chunk_size: 50,
            max_chunk_size: 400,
        };

        let kb = processor
            .create_knowledge_base("Ma base", "description", &documents, &options, None)
            .await
            .unwrap();

        assert_eq!(kb.total_documents, 2);
        assert_eq!(kb.kind, KnowledgeBaseKind::Custom);
        let expected_bytes: u64 = documents.iter().map(|d| d.content.len() as u64).sum();
        assert_eq!(kb.size_bytes, expected_bytes);

        let persisted = store.chunks_for_knowledge_base(&kb.id).await.unwrap();
        assert_eq!(persisted.len(), kb.total_chunks);
        assert!(kb.total_chunks > 0);
        assert!(kb.color.starts_with("hsl("));
    }

    #[tokio::test]
    async fn failed_creation_cleans_up_partial_state() {
        let (processor, store) = processor();
        // Second document chunkifies to nothing → EmptyChunkResult after the
        // first document already persisted chunks.
        let documents = vec![doc("ok.txt", &["alpha"]), SourceDocument {
            name: "vide.txt".to_string(),
            content: "  ".to_string(),
        }];

        let err = processor
            .create_knowledge_base("Base", "", &documents, &ChunkingOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::EmptyChunkResult { .. }));

        assert!(store.all_knowledge_bases().await.unwrap().is_empty());
        let leftover: usize = {
            // No chunk of any knowledge base should survive the cleanup.
            let kbs = store.all_knowledge_bases().await.unwrap();
            let mut count = 0;
            for kb in kbs {
                count += store.chunks_for_knowledge_base(&kb.id).await.unwrap().len();
            }
            count
        };
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn progress_is_monotonically_increasing() {
        let (processor, _store) = processor();
        let documents = vec![doc("un.txt", &["alpha", "beta"]), doc("deux.txt", &["gamma"])];
        let seen = Mutex::new(Vec::<f32>::new());
        let callback = |percent: f32, _stage: &str| {
            seen.lock().unwrap().push(percent);
        };

        processor
            .create_knowledge_base(
                "Base",
                "",
                &documents,
                &ChunkingOptions {
                    chunk_size: 150,
                    chunk_overlap: 0,
                    split_on: crate::models::SplitStrategy::Paragraph,
                    min_chunk_size: 50,
                    max_chunk_size: 400,
                },
                Some(&callback),
            )
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        for pair in seen.windows(2) {
            assert!(pair[1] >= pair[0], "progress went backwards: {:?}", pair);
        }
        assert_eq!(*seen.last().unwrap(), 100.0);
    }

    #[tokio::test]
    async fn embedding_cache_avoids_recomputation_across_documents() {
        struct Counting {
            calls: AtomicUsize,
        }
        #[async_trait]
        impl Embedder for Counting {
            fn model_id(&self) -> &str {
                "counting"
            }
            fn dims(&self) -> usize {
                1
            }
            fn max_tokens(&self) -> usize {
                512
            }
            async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1.0])
            }
        }

        let embeddings = Arc::new(EmbeddingService::new());
        let counter = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        embeddings.set_model(counter.clone());
        let store = Arc::new(InMemoryStore::new());
        let processor = DocumentProcessor::new(embeddings, store);

        let document = doc("même.txt", &["alpha"]);
        let options = ChunkingOptions {
            chunk_size: 500,
            chunk_overlap: 0,
            split_on: crate::models::SplitStrategy::Paragraph,
            min_chunk_size: 50,
            max_chunk_size: 1000,
        };
        processor
            .process_document(&document.content, "a.txt", "kb1", &options, None)
            .await
            .unwrap();
        processor
            .process_document(&document.content, "b.txt", "kb2", &options, None)
            .await
            .unwrap();

        // The identical text is embedded once; the second pass hits the cache.
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }
}
