use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::{error_chain, ApiError};
use crate::state::AppState;

/// Rebuilds from the source document. The response never carries the
/// underlying cause; it goes to the log instead.
pub async fn rebuild_index(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    match state.rebuild().await {
        Ok(chunk_count) => {
            tracing::info!("Index rebuilt with {} chunks", chunk_count);
            Ok(Json(json!({ "message": "Index rebuilt successfully" })))
        }
        Err(err) => {
            tracing::error!("Index rebuild failed: {}", error_chain(&err));
            Err(ApiError::Internal("Index rebuild failed".to_string()))
        }
    }
}
