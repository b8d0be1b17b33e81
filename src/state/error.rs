use thiserror::Error;

use crate::core::config::ConfigError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration")]
    Config(#[source] ConfigError),
}
