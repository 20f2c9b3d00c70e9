//! Session lifecycle over the HTTP surface: stages, initialization
//! idempotence, and the error paths that precede a working engine.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

#[tokio::test]
async fn health_and_status_respond() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(&app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"], 0);
    assert_eq!(body["completion_model"], "gemini-2.0-flash-exp");
    assert_eq!(body["embedding_model"], "text-embedding-004");
}

#[tokio::test]
async fn new_session_awaits_credential_and_rejects_chat() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());
    let session_id = create_session(&app).await;

    let (status, body) = get(&app, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["stage"], "awaiting_credential");
    assert_eq!(
        body["session"]["prompt"],
        "Enter your Gemini API key to get started"
    );

    // No chat before a credential is accepted.
    let (status, body) = post_json(
        &app,
        &format!("/api/sessions/{}/chat", session_id),
        json!({"message": "hello"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    // No ingestion either.
    let (status, _body) = post_multipart(
        &app,
        &format!("/api/sessions/{}/documents", session_id),
        &[("a.txt", b"text")],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn init_without_credential_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());
    let session_id = create_session(&app).await;

    let (status, body) = post_json(
        &app,
        &format!("/api/sessions/{}/engine", session_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");

    // Handle stays unset.
    let (_, body) = get(&app, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(body["session"]["stage"], "awaiting_credential");
}

#[tokio::test]
async fn init_is_idempotent_per_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());
    let session_id = create_session(&app).await;

    let (status, body) = post_json(
        &app,
        &format!("/api/sessions/{}/engine", session_id),
        json!({"api_key": "test-key"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["initialized"], true);
    assert_eq!(body["already"], false);

    // Re-triggering initialization keeps the existing handle.
    for _ in 0..3 {
        let (status, body) = post_json(
            &app,
            &format!("/api/sessions/{}/engine", session_id),
            json!({"api_key": "another-key"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["already"], true);
    }

    let (_, body) = get(&app, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(body["session"]["stage"], "awaiting_documents");
    assert_eq!(
        body["session"]["prompt"],
        "Upload documents to start chatting"
    );
}

#[tokio::test]
async fn failed_initialization_leaves_the_handle_unset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = test_app(dir.path());
    let session_id = create_session(&app).await;

    // A plain file where the working directory should go makes engine
    // construction fail.
    std::fs::write(state.paths.session_dir(&session_id), b"in the way").expect("block dir");

    let (status, body) = post_json(
        &app,
        &format!("/api/sessions/{}/engine", session_id),
        json!({"api_key": "test-key"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "init");

    // Handle stays unset, so uploads still conflict.
    let (_, body) = get(&app, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(body["session"]["stage"], "awaiting_credential");

    let (status, _body) = post_multipart(
        &app,
        &format!("/api/sessions/{}/documents", session_id),
        &[("a.txt", b"text")],
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn engine_ready_without_documents_rejects_chat() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());
    let session_id = create_session(&app).await;

    post_json(
        &app,
        &format!("/api/sessions/{}/engine", session_id),
        json!({"api_key": "test-key"}),
    )
    .await;

    let (status, body) = post_json(
        &app,
        &format!("/api/sessions/{}/chat", session_id),
        json!({"message": "anything yet?"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Upload documents to start chatting");
}

#[tokio::test]
async fn unreachable_backend_fails_each_file_without_short_circuit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());
    let session_id = create_session(&app).await;

    post_json(
        &app,
        &format!("/api/sessions/{}/engine", session_id),
        json!({"api_key": "test-key"}),
    )
    .await;

    // The configured base URL points at a closed port; every embed
    // call fails, but every file must still be attempted.
    let (status, body) = post_multipart(
        &app,
        &format!("/api/sessions/{}/documents", session_id),
        &[("a.txt", b"alpha"), ("b.md", b"beta")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["loaded"], 0);
    assert_eq!(body["results"].as_array().expect("results").len(), 2);

    // All-failure batch does not flip the documents flag.
    let (_, body) = get(&app, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(body["session"]["stage"], "awaiting_documents");
    assert_eq!(body["session"]["documents_loaded"], false);
}

#[tokio::test]
async fn clear_chat_works_in_any_stage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());
    let session_id = create_session(&app).await;

    // Session has no engine and no documents; clearing still succeeds.
    let (status, body) = delete(&app, &format!("/api/sessions/{}/messages", session_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], true);

    let (_, body) = get(&app, &format!("/api/sessions/{}/messages", session_id)).await;
    assert_eq!(body["messages"].as_array().expect("messages").len(), 0);
}

#[tokio::test]
async fn deleting_a_session_discards_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());
    let session_id = create_session(&app).await;

    let (status, body) = delete(&app, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _body) = get(&app, &format!("/api/sessions/{}", session_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn modes_endpoint_lists_the_four_strategies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = test_app(dir.path());

    let (status, body) = get(&app, "/api/modes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default"], "hybrid");

    let modes: Vec<&str> = body["modes"]
        .as_array()
        .expect("modes")
        .iter()
        .filter_map(|m| m["id"].as_str())
        .collect();
    assert_eq!(modes, vec!["hybrid", "local", "global", "naive"]);
}

#[tokio::test]
async fn config_endpoint_masks_the_credential() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = test_app(dir.path());

    std::fs::write(
        &state.paths.secrets_path,
        "gemini:\n  api_key: sk-super-secret\n",
    )
    .expect("write secrets");

    let (status, body) = get(&app, "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gemini"]["api_key"], "****");
}
