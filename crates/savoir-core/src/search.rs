//! Semantic search over persisted knowledge bases.
//!
//! [`RagEngine`] embeds the query, linearly scans the chunks of one (or
//! every) knowledge base by cosine similarity, and optionally re-ranks.
//! Exhaustive scanning is deliberate: at the scale of a single user's local
//! knowledge bases an index would not pay for itself.

use std::sync::Arc;

use chrono::Utc;

use crate::embedding::{find_similar, EmbeddingService};
use crate::error::{RagError, Result};
use crate::models::{RagConfig, SearchResult};
use crate::rerank::rerank;
use crate::store::KnowledgeStore;

/// Query-time retrieval service, dependency-injected like the document
/// processor.
pub struct RagEngine {
    embeddings: Arc<EmbeddingService>,
    store: Arc<dyn KnowledgeStore>,
}

impl RagEngine {
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<dyn KnowledgeStore>) -> Self {
        Self { embeddings, store }
    }

    /// Search one knowledge base.
    ///
    /// An empty knowledge base yields an empty result, not an error. Twice
    /// `config.max_results` candidates are fetched so the re-ranker has
    /// room to reorder before the final truncation.
    pub async fn search_in_knowledge_base(
        &self,
        query: &str,
        knowledge_base_id: &str,
        config: &RagConfig,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embeddings.embed(query).await?;

        let chunks = self
            .store
            .chunks_for_knowledge_base(knowledge_base_id)
            .await
            .map_err(RagError::Storage)?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let ranked = find_similar(
            &query_embedding,
            &chunks,
            config.similarity_threshold,
            config.max_results * 2,
        )?;

        let mut results: Vec<SearchResult> = ranked
            .into_iter()
            .map(|(index, similarity)| SearchResult::new(chunks[index].clone(), similarity))
            .collect();

        if config.use_reranking {
            results = rerank(query, results, Utc::now());
        }

        results.truncate(config.max_results);
        Ok(results)
    }

    /// Search every knowledge base and merge by relevance.
    pub async fn search_global(&self, query: &str, config: &RagConfig) -> Result<Vec<SearchResult>> {
        let knowledge_bases = self
            .store
            .all_knowledge_bases()
            .await
            .map_err(RagError::Storage)?;

        let mut all_results = Vec::new();
        for kb in &knowledge_bases {
            let results = self.search_in_knowledge_base(query, &kb.id, config).await?;
            all_results.extend(results);
        }

        all_results.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all_results.truncate(config.max_results);
        Ok(all_results)
    }
}
