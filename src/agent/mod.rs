//! The chat agent: retriever + prompt template + inference call, exposed as
//! one `ask` function.

pub mod chat_agent;
pub mod prompt;

pub use chat_agent::{ChatAgent, QueryAnswer, Source};
pub use prompt::build_prompt;
