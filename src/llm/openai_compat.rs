use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{LlmError, LlmProvider};
use super::types::ChatRequest;
use crate::core::config::LlmConfig;

/// Chat client for OpenAI-compatible `/chat/completions` endpoints. Groq is
/// the default target.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(name: impl Into<String>, base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let name = if config.base_url.contains("groq.com") {
            "groq"
        } else {
            "openai-compatible"
        };
        Self::new(
            name,
            config.base_url.clone(),
            config.model.clone(),
            config.api_key.clone(),
        )
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
        });

        if let (Some(obj), Some(t)) = (body.as_object_mut(), request.temperature) {
            obj.insert("temperature".to_string(), json!(t));
        }

        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        let mut builder = self.client.post(&url).json(&body);
        // A missing key is sent as-is; the endpoint's 401 is the error.
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = builder.send().await.map_err(|source| LlmError::Http {
            provider: self.name.clone(),
            source,
        })?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                provider: self.name.clone(),
                status,
                body: text,
            });
        }

        let payload: Value = res.json().await.map_err(|source| LlmError::Http {
            provider: self.name.clone(),
            source,
        })?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: self.name.clone(),
            })
    }
}
