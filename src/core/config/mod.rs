pub mod defaults;
pub mod paths;
pub mod service;
pub mod types;
pub mod validation;

use thiserror::Error;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use types::{AppConfig, EmbeddingConfig, EmbeddingProviderKind, LlmConfig, RagConfig, ServerConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
