use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::core::errors::ApiError;
use crate::ingest::ingest_batch;
use crate::state::AppState;

/// Batch document upload. Files are ingested strictly in order; the
/// response reports every file's outcome and the final count.
pub async fn upload_documents(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.sessions.engine(&session_id).await?.ok_or_else(|| {
        ApiError::Conflict("engine not initialized; enter your API key first".to_string())
    })?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart payload: {}", e)))?
    {
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read {}: {}", filename, e)))?;
        files.push((filename, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("no files in upload".to_string()));
    }

    let report = ingest_batch(&engine, files).await;
    state
        .sessions
        .record_loaded(&session_id, report.loaded)
        .await?;

    tracing::info!(
        session_id = %session_id,
        loaded = report.loaded,
        total = report.total,
        "upload batch processed"
    );
    Ok(Json(report))
}
