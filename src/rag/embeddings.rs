//! Embedding providers.
//!
//! `HashingEmbedder` maps lower-cased alphanumeric tokens into a fixed number
//! of buckets (feature hashing) and needs no model download or network.
//! `OpenAiEmbedder` talks to any server exposing an OpenAI-style
//! `/embeddings` route (Ollama, LM Studio, vLLM, OpenAI itself).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::vector_math::l2_normalize;

/// Inputs per request sent to a remote embedding server.
const REMOTE_BATCH_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed")]
    Http(#[from] reqwest::Error),
    #[error("embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("embedding service returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifies the vector space. Indexes built under one id cannot be
    /// searched with vectors from another.
    fn model_id(&self) -> &str;

    /// Length of every vector this embedder produces, when known up front.
    /// Remote embedders answer `None` and are checked per query instead.
    fn dimension(&self) -> Option<usize>;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                got: vectors.len(),
            });
        }
        Ok(vectors.remove(0))
    }
}

pub fn build_embedder(config: &EmbeddingConfig) -> Arc<dyn Embedder> {
    match config.provider {
        EmbeddingProviderKind::Hashing => {
            Arc::new(HashingEmbedder::new(config.model.clone(), config.dimension))
        }
        EmbeddingProviderKind::Openai => Arc::new(OpenAiEmbedder::new(
            config.base_url.clone(),
            config.model.clone(),
            config.api_key.clone(),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    model: String,
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension: dimension.max(1),
        }
    }

    /// Same text, same vector, on every platform and build.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut tf = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let idx = self.bucket(&token.to_lowercase());
            tf[idx] += 1.0;
        }

        l2_normalize(&mut tf);
        tf
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(head) % self.dimension as u64) as usize
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[derive(Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiEmbedder {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client: Client::new(),
        }
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        let mut payload: EmbeddingsResponse = res.json().await?;
        payload.data.sort_by_key(|item| item.index);
        if payload.data.len() != inputs.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: inputs.len(),
                got: payload.data.len(),
            });
        }

        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(REMOTE_BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_math::cosine_similarity;

    #[test]
    fn hashing_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new("feature-hash-64", 64);
        let a = embedder.embed_text("Vacation: 20 days.");
        let b = embedder.embed_text("Vacation: 20 days.");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hashing_ignores_case_and_punctuation() {
        let embedder = HashingEmbedder::new("feature-hash-128", 128);
        assert_eq!(
            embedder.embed_text("VACATION, days!"),
            embedder.embed_text("vacation days")
        );
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new("feature-hash-384", 384);
        let query = embedder.embed_text("How many vacation days?");
        let vacation = embedder.embed_text("Vacation: 20 days per year.");
        let expenses = embedder.embed_text("Expense reports are due monthly.");

        assert!(cosine_similarity(&query, &vacation) > cosine_similarity(&query, &expenses));
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        let embedder = HashingEmbedder::new("feature-hash-16", 16);
        assert!(embedder.embed_text("  ... ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn embed_query_returns_single_vector() {
        let embedder = HashingEmbedder::new("feature-hash-32", 32);
        let vector = embedder.embed_query("sick leave").await.unwrap();
        assert_eq!(vector, embedder.embed_text("sick leave"));
    }

    #[test]
    fn build_embedder_uses_configured_model_id() {
        let config = EmbeddingConfig::default();
        let embedder = build_embedder(&config);
        assert_eq!(embedder.model_id(), "feature-hash-384");
        assert_eq!(embedder.dimension(), Some(384));
    }
}
