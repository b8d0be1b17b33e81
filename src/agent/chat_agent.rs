use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::prompt::build_prompt;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::rag::{RagError, Retriever, VectorIndex};

/// One piece of evidence returned with an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub content: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Retriever + prompt + model, frozen together. The service swaps whole
/// agents on rebuild, so one `ask` always sees a single consistent index.
pub struct ChatAgent {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
    temperature: f64,
}

impl ChatAgent {
    pub fn new(retriever: Retriever, llm: Arc<dyn LlmProvider>, temperature: f64) -> Self {
        Self {
            retriever,
            llm,
            temperature,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        self.retriever.index()
    }

    pub async fn ask(&self, question: &str) -> Result<QueryAnswer, RagError> {
        let retrieved = self.retriever.retrieve(question).await?;
        let contents: Vec<&str> = retrieved.iter().map(|hit| hit.chunk.content.as_str()).collect();
        let prompt = build_prompt(&contents, question);

        tracing::debug!(
            "Asking {} with {} context chunks ({} prompt chars)",
            self.llm.name(),
            contents.len(),
            prompt.chars().count()
        );

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]).with_temperature(self.temperature);
        let answer = self.llm.chat(request).await.map_err(RagError::inference)?;

        let sources = retrieved
            .into_iter()
            .map(|hit| Source {
                content: hit.chunk.content,
                metadata: hit.chunk.metadata,
            })
            .collect();

        Ok(QueryAnswer { answer, sources })
    }
}
