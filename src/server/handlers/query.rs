use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::agent::QueryAnswer;
use crate::core::errors::ApiError;
use crate::state::AppState;

/// Characters of the answer echoed into the log.
const ANSWER_LOG_PREFIX: usize = 120;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryAnswer>, ApiError> {
    tracing::info!("Received query: {}", request.query);
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let result = match state.current_agent() {
        Ok(agent) => agent.ask(&request.query).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(answer) => {
            let preview: String = answer.answer.chars().take(ANSWER_LOG_PREFIX).collect();
            tracing::info!(
                "Answered with {} sources: {}",
                answer.sources.len(),
                preview
            );
            Ok(Json(answer))
        }
        Err(err) => {
            let api_error = ApiError::internal_with_chain(&err);
            tracing::error!("Query failed: {}", api_error);
            Err(api_error)
        }
    }
}
