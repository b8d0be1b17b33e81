//! The vector index: build from the source document, persist to the index
//! directory, load back into an immutable in-memory snapshot.
//!
//! Directory layout:
//! - `index.db`: chunks and embeddings (see `SqliteRagStore`)
//! - `manifest.json`: embedding model, dimension, chunk count, source hash
//!
//! A rebuild writes a complete new directory next to the old one and swaps
//! it in with renames, so a reader never sees half an index.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::chunker::CharacterSplitter;
use super::embeddings::Embedder;
use super::error::RagError;
use super::loader::load_and_split;
use super::sqlite::SqliteRagStore;
use super::store::{RagStore, StoredChunk};
use crate::vector_math::rank_descending_by_cosine;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub source_path: String,
    pub source_sha256: String,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub score: f32,
}

/// Read-only snapshot of every (chunk, vector) pair in an index.
#[derive(Debug)]
pub struct VectorIndex {
    manifest: IndexManifest,
    entries: Vec<(StoredChunk, Vec<f32>)>,
}

impl VectorIndex {
    pub fn new(manifest: IndexManifest, entries: Vec<(StoredChunk, Vec<f32>)>) -> Self {
        Self { manifest, entries }
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &StoredChunk> {
        self.entries.iter().map(|(chunk, _)| chunk)
    }

    /// Brute-force cosine search. No threshold, no dedup; equal scores keep
    /// document order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        rank_descending_by_cosine(query, self.entries.iter().map(|(_, v)| v.as_slice()))
            .into_iter()
            .take(k)
            .map(|(idx, score)| ScoredChunk {
                chunk: self.entries[idx].0.clone(),
                score,
            })
            .collect()
    }
}

pub fn source_fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Chunks and embeds `source_path`, then replaces whatever is at
/// `index_dir` with the result.
pub async fn build_index(
    source_path: &Path,
    index_dir: &Path,
    splitter: &CharacterSplitter,
    embedder: &dyn Embedder,
) -> Result<VectorIndex, RagError> {
    sweep_stale_siblings(index_dir).await;

    let (text, chunks) = load_and_split(source_path, splitter).await?;
    if chunks.is_empty() {
        return Err(RagError::build(format!(
            "{} produced no chunks",
            source_path.display()
        )));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder
        .embed_documents(&texts)
        .await
        .map_err(RagError::build)?;
    if vectors.len() != chunks.len() {
        return Err(RagError::build(format!(
            "embedder returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }

    let manifest = IndexManifest {
        embedding_model: embedder.model_id().to_string(),
        dimension: vectors.first().map(Vec::len).unwrap_or(0),
        chunk_count: chunks.len(),
        source_path: source_path.to_string_lossy().to_string(),
        source_sha256: source_fingerprint(&text),
        built_at: Utc::now(),
    };
    let entries: Vec<(StoredChunk, Vec<f32>)> = chunks.into_iter().zip(vectors).collect();

    let staging = sibling_path(index_dir, "staging")?;
    if let Err(err) = write_index_dir(&staging, &manifest, entries.clone()).await {
        let _ = tokio::fs::remove_dir_all(&staging).await;
        return Err(err);
    }
    swap_into_place(&staging, index_dir).await?;

    tracing::info!(
        "Index saved at {} ({} chunks, model {})",
        index_dir.display(),
        manifest.chunk_count,
        manifest.embedding_model
    );

    Ok(VectorIndex::new(manifest, entries))
}

/// Loads a previously built index. The embedder must be the one the index
/// was built with, otherwise query vectors would live in another space.
pub async fn load_index(index_dir: &Path, embedder: &dyn Embedder) -> Result<VectorIndex, RagError> {
    let manifest = read_manifest(index_dir).await?;
    if manifest.embedding_model != embedder.model_id() {
        return Err(RagError::load(format!(
            "index was built with embedding model {:?} but {:?} is configured; rebuild the index",
            manifest.embedding_model,
            embedder.model_id()
        )));
    }
    if let Some(dimension) = embedder.dimension() {
        if dimension != manifest.dimension {
            return Err(RagError::load(format!(
                "index holds {}-dimensional vectors but the embedder produces {}; rebuild the index",
                manifest.dimension, dimension
            )));
        }
    }

    let store = SqliteRagStore::open_existing(index_dir)
        .await
        .map_err(RagError::load)?;
    let loaded = store.load_all().await;
    store.close().await;
    let entries = loaded.map_err(RagError::load)?;

    if let Some((chunk, vector)) = entries.iter().find(|(_, v)| v.len() != manifest.dimension) {
        return Err(RagError::load(format!(
            "chunk {} has a {}-dimensional vector, manifest says {}",
            chunk.chunk_id,
            vector.len(),
            manifest.dimension
        )));
    }

    if entries.len() != manifest.chunk_count {
        tracing::warn!(
            "Index manifest lists {} chunks but the store holds {}",
            manifest.chunk_count,
            entries.len()
        );
    }

    Ok(VectorIndex::new(manifest, entries))
}

pub async fn read_manifest(index_dir: &Path) -> Result<IndexManifest, RagError> {
    let raw = tokio::fs::read_to_string(index_dir.join(MANIFEST_FILE))
        .await
        .map_err(RagError::load)?;
    serde_json::from_str(&raw).map_err(RagError::load)
}

/// `Some(true)` when the source file still hashes to what the index was
/// built from, `None` when the source cannot be read.
pub async fn is_fresh(manifest: &IndexManifest, source_path: &Path) -> Option<bool> {
    let text = tokio::fs::read_to_string(source_path).await.ok()?;
    Some(source_fingerprint(&text) == manifest.source_sha256)
}

async fn write_index_dir(
    dir: &Path,
    manifest: &IndexManifest,
    entries: Vec<(StoredChunk, Vec<f32>)>,
) -> Result<(), RagError> {
    tokio::fs::create_dir_all(dir).await.map_err(RagError::build)?;

    let store = SqliteRagStore::open(dir).await.map_err(RagError::build)?;
    let inserted = store.insert_batch(entries).await;
    store.close().await;
    inserted.map_err(RagError::build)?;

    let manifest_json = serde_json::to_vec_pretty(manifest).map_err(RagError::build)?;
    tokio::fs::write(dir.join(MANIFEST_FILE), manifest_json)
        .await
        .map_err(RagError::build)
}

async fn swap_into_place(staging: &Path, index_dir: &Path) -> Result<(), RagError> {
    if !tokio::fs::try_exists(index_dir).await.unwrap_or(false) {
        return tokio::fs::rename(staging, index_dir)
            .await
            .map_err(RagError::build);
    }

    let retired = sibling_path(index_dir, "old")?;
    tokio::fs::rename(index_dir, &retired)
        .await
        .map_err(RagError::build)?;

    if let Err(err) = tokio::fs::rename(staging, index_dir).await {
        let _ = tokio::fs::rename(&retired, index_dir).await;
        let _ = tokio::fs::remove_dir_all(staging).await;
        return Err(RagError::build(err));
    }

    if let Err(err) = tokio::fs::remove_dir_all(&retired).await {
        tracing::warn!("Failed to remove old index at {}: {}", retired.display(), err);
    }
    Ok(())
}

/// Removes `.<name>.staging-*` and `.<name>.old-*` directories left behind
/// by a build that died before it could clean up.
async fn sweep_stale_siblings(index_dir: &Path) {
    let (Some(parent), Some(name)) = (index_dir.parent(), index_dir.file_name()) else {
        return;
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    let name = name.to_string_lossy();
    let prefixes = [format!(".{name}.staging-"), format!(".{name}.old-")];

    let Ok(mut entries) = tokio::fs::read_dir(parent).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !prefixes.iter().any(|p| file_name.starts_with(p.as_str())) {
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => tracing::info!("Removed leftover index directory {}", path.display()),
            Err(err) => tracing::warn!("Failed to remove {}: {}", path.display(), err),
        }
    }
}

fn sibling_path(index_dir: &Path, tag: &str) -> Result<PathBuf, RagError> {
    let name = index_dir
        .file_name()
        .ok_or_else(|| RagError::build(format!("invalid index dir {}", index_dir.display())))?
        .to_string_lossy();
    Ok(index_dir.with_file_name(format!(".{name}.{tag}-{}", Uuid::new_v4().simple())))
}
