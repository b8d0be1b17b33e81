//! SQLite-backed RAG store.
//!
//! One `index.db` per index directory. Embeddings are stored as
//! little-endian f32 blobs; search happens on the in-memory snapshot built
//! from `load_all`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{RagStore, StoreError, StoredChunk};

pub const INDEX_DB_FILE: &str = "index.db";

pub struct SqliteRagStore {
    pool: SqlitePool,
}

impl SqliteRagStore {
    /// Opens (creating if needed) `index.db` inside `index_dir`.
    pub async fn open(index_dir: &Path) -> Result<Self, StoreError> {
        Self::with_path(index_dir.join(INDEX_DB_FILE), true).await
    }

    /// Opens an existing `index.db`; fails if it is absent.
    pub async fn open_existing(index_dir: &Path) -> Result<Self, StoreError> {
        Self::with_path(index_dir.join(INDEX_DB_FILE), false).await
    }

    async fn with_path(db_path: PathBuf, create: bool) -> Result<Self, StoreError> {
        // Rollback journal so the directory is self-contained once the pool
        // is closed and can be renamed as a unit.
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Delete)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(2)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                chunk_id TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(chunk_id: &str, bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
        if bytes.len() % 4 != 0 {
            return Err(StoreError::CorruptEmbedding {
                chunk_id: chunk_id.to_string(),
                len: bytes.len(),
            });
        }

        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<(StoredChunk, Vec<f32>), StoreError> {
        let chunk_id: String = row.get("chunk_id");
        let metadata_str: String = row.get("metadata");
        let embedding_bytes: Vec<u8> = row.get("embedding");
        let embedding = Self::deserialize_embedding(&chunk_id, &embedding_bytes)?;

        let chunk = StoredChunk {
            chunk_id,
            content: row.get("content"),
            source: row.get("source"),
            metadata: serde_json::from_str(&metadata_str)?,
        };

        Ok((chunk, embedding))
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn insert_batch(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = serde_json::to_string(&chunk.metadata)?;

            sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks (chunk_id, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<(StoredChunk, Vec<f32>)>, StoreError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, metadata, embedding
             FROM rag_chunks
             ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }
}
