use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::llm::{
    GeminiBackend, DEFAULT_BASE_URL, DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL,
};
use crate::rag::RagEngine;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InitEngineRequest {
    pub api_key: Option<String>,
}

/// Initialize the session's retrieval engine. Idempotent: a second
/// call reports `already: true` and leaves the existing handle alone.
pub async fn init_engine(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Option<Json<InitEngineRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    if state.sessions.engine(&session_id).await?.is_some() {
        return Ok(Json(json!({ "initialized": true, "already": true })));
    }

    // Manual entry wins over the preconfigured secret. Presence is the
    // only validation; a bad key surfaces on the first backend call.
    let api_key = payload
        .and_then(|Json(p)| p.api_key)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(|| state.config.configured_api_key())
        .ok_or_else(|| {
            ApiError::BadRequest(
                "missing API credential: supply api_key or configure gemini.api_key".to_string(),
            )
        })?;

    let base_url = state
        .config
        .get_str(&["gemini", "base_url"])
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let completion_model = state
        .config
        .get_str(&["gemini", "completion_model"])
        .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string());
    let embedding_model = state
        .config
        .get_str(&["gemini", "embedding_model"])
        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());

    let backend = Arc::new(GeminiBackend::with_models(
        api_key,
        base_url,
        completion_model,
        embedding_model,
    ));

    let engine = RagEngine::new(
        state.paths.session_dir(&session_id),
        backend,
        state.engine_config(),
    )?;

    let installed = state
        .sessions
        .install_engine(&session_id, Arc::new(engine))
        .await?;

    Ok(Json(json!({ "initialized": true, "already": !installed })))
}
