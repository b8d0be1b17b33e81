use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::types::AppConfig;
use super::validation::validate_config;
use super::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "bearer",
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("POLICY_QA_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.project_root.join("secrets.yaml")
    }

    /// `config.yml` deep-merged with `secrets.yaml`, untyped.
    pub fn load_raw(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    /// Loads, applies environment overrides and validates.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config: AppConfig = serde_json::from_value(self.load_raw())?;
        apply_env_overrides(&mut config, |key| env::var(key).ok());
        validate_config(&config)?;
        Ok(config)
    }

    pub fn redacted(&self, config: &AppConfig) -> Value {
        match serde_json::to_value(config) {
            Ok(value) => redact_sensitive_values(&value),
            Err(_) => Value::Null,
        }
    }
}

/// `GROQ_MODEL` and `GROQ_API_KEY` select the chat model and its credential;
/// `PORT` and `EMBEDDING_API_KEY` are convenience overrides.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(model) = lookup("GROQ_MODEL").filter(|v| !v.trim().is_empty()) {
        config.llm.model = model;
    }
    if let Some(key) = lookup("GROQ_API_KEY").filter(|v| !v.trim().is_empty()) {
        config.llm.api_key = Some(key);
    }
    if let Some(key) = lookup("EMBEDDING_API_KEY").filter(|v| !v.trim().is_empty()) {
        config.embedding.api_key = Some(key);
    }
    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("Ignoring unparsable PORT value {:?}", port),
        }
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}
