use std::path::PathBuf;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong between reading the policy file and
/// returning an answer. Only the HTTP handlers turn these into responses.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Chat agent not initialized")]
    NotInitialized,

    #[error("source document not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("index build failed")]
    IndexBuildFailed(#[source] BoxError),

    #[error("index load failed")]
    IndexLoadFailed(#[source] BoxError),

    #[error("embedding failed")]
    EmbeddingFailed(#[source] BoxError),

    #[error("inference failed")]
    InferenceFailed(#[source] BoxError),
}

impl RagError {
    pub fn build(err: impl Into<BoxError>) -> Self {
        RagError::IndexBuildFailed(err.into())
    }

    pub fn load(err: impl Into<BoxError>) -> Self {
        RagError::IndexLoadFailed(err.into())
    }

    pub fn embedding(err: impl Into<BoxError>) -> Self {
        RagError::EmbeddingFailed(err.into())
    }

    pub fn inference(err: impl Into<BoxError>) -> Self {
        RagError::InferenceFailed(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::error_chain;

    #[test]
    fn chain_includes_the_underlying_cause() {
        let err = RagError::inference("HTTP 401: invalid api key");
        assert_eq!(error_chain(&err), "inference failed: HTTP 401: invalid api key");
    }

    #[test]
    fn not_initialized_has_fixed_message() {
        assert_eq!(RagError::NotInitialized.to_string(), "Chat agent not initialized");
    }
}
