//! In-memory [`KnowledgeStore`] implementation for tests and prototypes.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Lookup by knowledge base is a linear scan, which matches the engine's
//! exhaustive-search retrieval model.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DocumentChunk, KnowledgeBase};

use super::KnowledgeStore;

/// In-memory store.
pub struct InMemoryStore {
    knowledge_bases: RwLock<HashMap<String, KnowledgeBase>>,
    chunks: RwLock<Vec<DocumentChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            knowledge_bases: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn save_knowledge_base(&self, kb: &KnowledgeBase) -> Result<()> {
        let mut kbs = self.knowledge_bases.write().unwrap();
        kbs.insert(kb.id.clone(), kb.clone());
        Ok(())
    }

    async fn get_knowledge_base(&self, id: &str) -> Result<Option<KnowledgeBase>> {
        let kbs = self.knowledge_bases.read().unwrap();
        Ok(kbs.get(id).cloned())
    }

    async fn all_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>> {
        let kbs = self.knowledge_bases.read().unwrap();
        let mut all: Vec<KnowledgeBase> = kbs.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn delete_knowledge_base(&self, id: &str) -> Result<()> {
        self.knowledge_bases.write().unwrap().remove(id);
        self.chunks
            .write()
            .unwrap()
            .retain(|chunk| chunk.metadata.source_id != id);
        Ok(())
    }

    async fn save_chunks(&self, chunks: &[DocumentChunk]) -> Result<()> {
        self.chunks.write().unwrap().extend_from_slice(chunks);
        Ok(())
    }

    async fn chunks_for_knowledge_base(&self, kb_id: &str) -> Result<Vec<DocumentChunk>> {
        let chunks = self.chunks.read().unwrap();
        Ok(chunks
            .iter()
            .filter(|chunk| chunk.metadata.source_id == kb_id)
            .cloned()
            .collect())
    }
}
