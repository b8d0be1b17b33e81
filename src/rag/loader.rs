use std::path::Path;

use serde_json::json;
use uuid::Uuid;

use super::chunker::{CharacterSplitter, TextChunk};
use super::error::RagError;
use super::store::StoredChunk;

/// Reads the source document. A missing file is reported as
/// `SourceMissing` so callers can tell it apart from other I/O failures.
pub async fn load_source(path: &Path) -> Result<String, RagError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(RagError::SourceMissing(path.to_path_buf()));
    }

    tokio::fs::read_to_string(path).await.map_err(RagError::build)
}

pub async fn load_and_split(
    path: &Path,
    splitter: &CharacterSplitter,
) -> Result<(String, Vec<StoredChunk>), RagError> {
    let text = load_source(path).await?;
    let source = path.to_string_lossy().to_string();
    let chunks = to_stored_chunks(splitter.split(&text), &source);
    Ok((text, chunks))
}

pub fn to_stored_chunks(chunks: Vec<TextChunk>, source: &str) -> Vec<StoredChunk> {
    chunks
        .into_iter()
        .map(|chunk| StoredChunk {
            chunk_id: Uuid::new_v4().to_string(),
            metadata: json!({
                "source": source,
                "chunk_index": chunk.chunk_index,
                "start_offset": chunk.start_offset,
                "end_offset": chunk.end_offset,
            }),
            content: chunk.text,
            source: source.to_string(),
        })
        .collect()
}
