//! RagStore trait: persistence seam for (chunk, embedding) pairs.
//!
//! The index directory holds one store; `SqliteRagStore` is the backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chunk as persisted and as returned to callers as a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub content: String,
    /// Path of the document the chunk came from.
    pub source: String,
    /// `chunk_index`, `start_offset`, `end_offset` and `source`.
    pub metadata: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("chunk metadata is not valid JSON: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("chunk {chunk_id} has a corrupt embedding blob ({len} bytes)")]
    CorruptEmbedding { chunk_id: String, len: usize },
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Insert chunks with their vectors in one transaction.
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), StoreError>;

    /// Every stored pair, in insertion order.
    async fn load_all(&self) -> Result<Vec<(StoredChunk, Vec<f32>)>, StoreError>;
}
