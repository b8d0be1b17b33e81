use super::types::AppConfig;
use super::ConfigError;

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port", "must be between 1 and 65535"));
    }
    if config.server.host.trim().is_empty() {
        return Err(invalid("server.host", "must not be empty"));
    }

    let rag = &config.rag;
    if rag.chunk_size == 0 {
        return Err(invalid("rag.chunk_size", "must be greater than 0"));
    }
    if rag.chunk_overlap >= rag.chunk_size {
        return Err(invalid(
            "rag.chunk_overlap",
            format!(
                "must be smaller than rag.chunk_size ({} >= {})",
                rag.chunk_overlap, rag.chunk_size
            ),
        ));
    }
    if rag.source_path.as_os_str().is_empty() {
        return Err(invalid("rag.source_path", "must not be empty"));
    }
    if rag.index_dir.as_os_str().is_empty() {
        return Err(invalid("rag.index_dir", "must not be empty"));
    }

    if config.embedding.dimension == 0 {
        return Err(invalid("embedding.dimension", "must be greater than 0"));
    }
    if config.embedding.model.trim().is_empty() {
        return Err(invalid("embedding.model", "must not be empty"));
    }

    let temperature = config.llm.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        return Err(invalid(
            "llm.temperature",
            format!("must be within 0.0..=2.0, got {temperature}"),
        ));
    }
    if config.llm.model.trim().is_empty() {
        return Err(invalid("llm.model", "must not be empty"));
    }

    Ok(())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
