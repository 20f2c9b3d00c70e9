use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy for the retrieval engine and its adapters.
///
/// Each adapter reports its own kind so callers can branch on the
/// variant instead of inspecting message strings.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("initialization failed: {0}")]
    Init(String),
    #[error("ingestion failed: {0}")]
    Ingest(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Init(_) => "init",
            EngineError::Ingest(_) => "ingest",
            EngineError::Query(_) => "query",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind, message) = match &self {
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg.clone()),
            ApiError::Engine(err) => {
                let status = match err {
                    EngineError::Init(_) => StatusCode::BAD_GATEWAY,
                    EngineError::Ingest(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    EngineError::Query(_) => StatusCode::BAD_GATEWAY,
                };
                (status, err.kind(), err.to_string())
            }
        };

        let body = Json(json!({ "error": message, "kind": kind }));
        (status, body).into_response()
    }
}
