//! Policy question-answering backend.
//!
//! Loads a policy document, chunks and embeds it into a persisted vector
//! index, and answers questions over HTTP by retrieving the closest chunks
//! and handing them to a hosted chat model.

pub mod agent;
pub mod core;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod vector_math;
