//! Retrieval side of the service: chunking, embedding, the persisted vector
//! index and the top-k retriever built on it.

pub mod chunker;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod loader;
pub mod retriever;
pub mod sqlite;
pub mod store;

pub use chunker::{CharacterSplitter, TextChunk};
pub use embeddings::{build_embedder, Embedder, EmbeddingError, HashingEmbedder, OpenAiEmbedder};
pub use error::RagError;
pub use index::{build_index, load_index, IndexManifest, ScoredChunk, VectorIndex};
pub use retriever::{Retriever, TOP_K};
pub use store::{RagStore, StoredChunk};
