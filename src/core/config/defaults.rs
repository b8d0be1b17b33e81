pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_SOURCE_PATH: &str = "data/enterprise_policies.txt";
pub const DEFAULT_INDEX_DIR: &str = "vector_index";
pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

pub const DEFAULT_EMBEDDING_MODEL: &str = "feature-hash-384";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "http://localhost:11434/v1";

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_LLM_TEMPERATURE: f64 = 0.3;
