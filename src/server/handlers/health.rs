use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::llm::{DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL};
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.count().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds();

    let completion_model = state
        .config
        .get_str(&["gemini", "completion_model"])
        .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string());
    let embedding_model = state
        .config
        .get_str(&["gemini", "embedding_model"])
        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());

    Ok(Json(json!({
        "status": "ok",
        "sessions": sessions,
        "uptime_secs": uptime_secs,
        "completion_model": completion_model,
        "embedding_model": embedding_model,
    })))
}
