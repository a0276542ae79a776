//! SQLite-backed [`KnowledgeStore`] implementation.
//!
//! Knowledge bases and chunks map to two tables; embedding vectors are
//! stored as little-endian `f32` BLOBs. Deleting a knowledge base cascades
//! to its chunks inside one transaction.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use savoir_core::embedding::{blob_to_vec, vec_to_blob};
use savoir_core::models::{
    ChunkMetadata, DocumentChunk, KnowledgeBase, KnowledgeBaseKind,
};
use savoir_core::store::KnowledgeStore;

/// SQLite implementation of the [`KnowledgeStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}

fn kind_from_str(kind: &str) -> KnowledgeBaseKind {
    match kind {
        "predefined" => KnowledgeBaseKind::Predefined,
        _ => KnowledgeBaseKind::Custom,
    }
}

fn row_to_knowledge_base(row: &sqlx::sqlite::SqliteRow) -> KnowledgeBase {
    KnowledgeBase {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        kind: kind_from_str(row.get("kind")),
        color: row.get("color"),
        total_documents: row.get::<i64, _>("total_documents") as usize,
        total_chunks: row.get::<i64, _>("total_chunks") as usize,
        size_bytes: row.get::<i64, _>("size_bytes") as u64,
        created_at: timestamp_to_datetime(row.get("created_at")),
        updated_at: timestamp_to_datetime(row.get("updated_at")),
    }
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    async fn save_knowledge_base(&self, kb: &KnowledgeBase) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_bases (id, name, description, kind, color,
                                         total_documents, total_chunks, size_bytes,
                                         created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                kind = excluded.kind,
                color = excluded.color,
                total_documents = excluded.total_documents,
                total_chunks = excluded.total_chunks,
                size_bytes = excluded.size_bytes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&kb.id)
        .bind(&kb.name)
        .bind(&kb.description)
        .bind(kb.kind.as_str())
        .bind(&kb.color)
        .bind(kb.total_documents as i64)
        .bind(kb.total_chunks as i64)
        .bind(kb.size_bytes as i64)
        .bind(kb.created_at.timestamp())
        .bind(kb.updated_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_knowledge_base(&self, id: &str) -> Result<Option<KnowledgeBase>> {
        let row = sqlx::query("SELECT * FROM knowledge_bases WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_knowledge_base))
    }

    async fn all_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>> {
        let rows = sqlx::query("SELECT * FROM knowledge_bases ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_knowledge_base).collect())
    }

    async fn delete_knowledge_base(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE knowledge_base_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM knowledge_bases WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn save_chunks(&self, chunks: &[DocumentChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO chunks (id, knowledge_base_id, source_name,
                                               chunk_index, start_char, end_char,
                                               created_at, content, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.metadata.source_id)
            .bind(&chunk.metadata.source_name)
            .bind(chunk.metadata.chunk_index as i64)
            .bind(chunk.metadata.start_char as i64)
            .bind(chunk.metadata.end_char as i64)
            .bind(chunk.metadata.created_at.timestamp())
            .bind(&chunk.content)
            .bind(vec_to_blob(&chunk.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn chunks_for_knowledge_base(&self, kb_id: &str) -> Result<Vec<DocumentChunk>> {
        let rows = sqlx::query(
            "SELECT * FROM chunks WHERE knowledge_base_id = ? ORDER BY source_name, chunk_index",
        )
        .bind(kb_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DocumentChunk {
                id: row.get("id"),
                content: row.get("content"),
                embedding: blob_to_vec(row.get::<Vec<u8>, _>("embedding").as_slice()),
                metadata: ChunkMetadata {
                    source_id: row.get("knowledge_base_id"),
                    source_name: row.get("source_name"),
                    chunk_index: row.get::<i64, _>("chunk_index") as usize,
                    start_char: row.get::<i64, _>("start_char") as usize,
                    end_char: row.get::<i64, _>("end_char") as usize,
                    created_at: timestamp_to_datetime(row.get("created_at")),
                },
            })
            .collect())
    }
}
