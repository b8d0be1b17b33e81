use async_trait::async_trait;
use thiserror::Error;

use super::types::ChatRequest;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to {provider} failed")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} response had no message content")]
    EmptyResponse { provider: String },
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs, e.g. "groq".
    fn name(&self) -> &str;

    /// Model id sent with every request.
    fn model(&self) -> &str;

    /// Non-streaming chat completion; returns the assistant text verbatim.
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError>;
}
