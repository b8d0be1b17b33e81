use std::sync::Arc;

use super::embeddings::Embedder;
use super::error::RagError;
use super::index::{ScoredChunk, VectorIndex};

/// Number of chunks handed to the model per question.
pub const TOP_K: usize = 3;

/// Fixed-policy similarity retriever over one index snapshot.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, RagError> {
        let query_vector = self
            .embedder
            .embed_query(query)
            .await
            .map_err(RagError::embedding)?;

        let expected = self.index.manifest().dimension;
        if query_vector.len() != expected {
            return Err(RagError::embedding(format!(
                "query vector has {} dimensions but the index holds {}",
                query_vector.len(),
                expected
            )));
        }

        Ok(self.index.search(&query_vector, TOP_K))
    }
}
