use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::QueryMode;
use crate::session::{Message, Role, SessionStage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub mode: QueryMode,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = payload.message.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("empty message".to_string()));
    }

    let view = state.sessions.view(&session_id).await?;
    let engine = match state.sessions.engine(&session_id).await? {
        Some(engine) if view.documents_loaded => engine,
        Some(_) => {
            return Err(ApiError::Conflict(
                SessionStage::AwaitingDocuments.prompt().to_string(),
            ))
        }
        None => {
            return Err(ApiError::Conflict(
                SessionStage::AwaitingCredential.prompt().to_string(),
            ))
        }
    };

    // The user turn is committed only together with the assistant
    // turn; a failed query leaves the transcript untouched.
    let user = Message::now(Role::User, question.clone());
    let answer = engine.query(&question, payload.mode).await?;
    let assistant = Message::now(Role::Assistant, answer);

    state
        .sessions
        .append_turn(&session_id, user.clone(), assistant.clone())
        .await?;

    Ok(Json(json!({
        "messages": [user, assistant],
        "mode": payload.mode,
    })))
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.sessions.messages(&session_id).await?;
    Ok(Json(json!({ "messages": messages })))
}

pub async fn clear_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.clear_messages(&session_id).await?;
    Ok(Json(json!({ "cleared": true })))
}

pub async fn list_modes() -> impl IntoResponse {
    let modes: Vec<_> = QueryMode::all()
        .into_iter()
        .map(|mode| {
            json!({
                "id": mode.as_str(),
                "description": mode.describe(),
            })
        })
        .collect();

    Json(json!({
        "modes": modes,
        "default": QueryMode::default().as_str(),
    }))
}
