use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Domain-Aware Chat API is running" }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.status())
}
