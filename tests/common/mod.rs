#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use docchat_backend::core::config::AppPaths;
use docchat_backend::llm::{BackendError, LanguageBackend};
use docchat_backend::rag::{EngineConfig, RagEngine};
use docchat_backend::server::router::router;
use docchat_backend::state::AppState;

pub const MULTIPART_BOUNDARY: &str = "docchat-test-boundary";

/// App rooted at a scratch directory. The configured backend base URL
/// points at a closed local port so real engine calls fail fast
/// instead of reaching the network.
pub fn test_app(dir: &Path) -> (Router, Arc<AppState>) {
    std::fs::write(
        dir.join("config.yml"),
        "gemini:\n  base_url: \"http://127.0.0.1:9/v1\"\n",
    )
    .expect("write config");

    let paths = Arc::new(AppPaths::rooted_at(dir));
    let state = AppState::with_paths(paths);
    (router(state.clone()), state)
}

/// Backend that answers deterministically without any network.
pub struct StubBackend;

#[async_trait]
impl LanguageBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(
        &self,
        _system_prompt: Option<&str>,
        _prompt: &str,
    ) -> Result<String, BackendError> {
        Ok("the documents say hello".to_string())
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        Ok(inputs.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

/// Backend whose embeddings work but whose completion always fails.
pub struct FailingCompletionBackend;

#[async_trait]
impl LanguageBackend for FailingCompletionBackend {
    fn name(&self) -> &str {
        "failing-completion"
    }

    async fn complete(
        &self,
        _system_prompt: Option<&str>,
        _prompt: &str,
    ) -> Result<String, BackendError> {
        Err(BackendError::Transport("completion unavailable".to_string()))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        Ok(inputs.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

pub fn stub_engine(state: &AppState, session_id: &str, backend: Arc<dyn LanguageBackend>) -> Arc<RagEngine> {
    Arc::new(
        RagEngine::new(
            state.paths.session_dir(session_id),
            backend,
            EngineConfig::default(),
        )
        .expect("engine"),
    )
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        json!(null)
    } else {
        // Extractor rejections carry a plain text body.
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app, request).await
}

pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    send(app, request).await
}

/// Multipart upload body for a list of (filename, contents) parts.
pub fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, contents) in files {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub async fn post_multipart(
    app: &Router,
    uri: &str,
    files: &[(&str, &[u8])],
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(multipart_body(files)))
        .expect("request");
    send(app, request).await
}

/// Create a session over the API and return its id.
pub async fn create_session(app: &Router) -> String {
    let (status, body) = post_empty(app, "/api/sessions").await;
    assert_eq!(status, StatusCode::OK);
    body["session"]["id"].as_str().expect("session id").to_string()
}
