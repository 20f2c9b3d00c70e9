//! Per-session state: the engine handle, the chat transcript, and the
//! documents-loaded flag. Sessions are created empty, mutated by the
//! handlers, and discarded when the client ends them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::rag::RagEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One chat turn. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Wall-clock time of the turn, "HH:MM:SS".
    pub timestamp: String,
}

impl Message {
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Linear session lifecycle. Every transition is one-way except the
/// chat loop inside `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    AwaitingCredential,
    AwaitingDocuments,
    Ready,
}

impl SessionStage {
    pub fn prompt(&self) -> &'static str {
        match self {
            SessionStage::AwaitingCredential => "Enter your Gemini API key to get started",
            SessionStage::AwaitingDocuments => "Upload documents to start chatting",
            SessionStage::Ready => "Ask a question about your documents",
        }
    }
}

struct Session {
    id: String,
    engine: Option<Arc<RagEngine>>,
    transcript: Vec<Message>,
    documents_loaded: bool,
    document_count: usize,
    created_at: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            engine: None,
            transcript: Vec::new(),
            documents_loaded: false,
            document_count: 0,
            created_at: Utc::now(),
        }
    }

    fn stage(&self) -> SessionStage {
        if self.engine.is_none() {
            SessionStage::AwaitingCredential
        } else if !self.documents_loaded {
            SessionStage::AwaitingDocuments
        } else {
            SessionStage::Ready
        }
    }

    fn view(&self) -> SessionView {
        let stage = self.stage();
        SessionView {
            id: self.id.clone(),
            stage,
            prompt: stage.prompt(),
            documents_loaded: self.documents_loaded,
            document_count: self.document_count,
            message_count: self.transcript.len(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub stage: SessionStage,
    pub prompt: &'static str,
    pub documents_loaded: bool,
    pub document_count: usize,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Process-local session map shared across handlers.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> SessionView {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone());
        let view = session.view();
        self.sessions.write().await.insert(id, session);
        view
    }

    pub async fn list(&self) -> Vec<SessionView> {
        let sessions = self.sessions.read().await;
        let mut views: Vec<SessionView> = sessions.values().map(Session::view).collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        views
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn view(&self, session_id: &str) -> Result<SessionView, ApiError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(Session::view)
            .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))
    }

    pub async fn remove(&self, session_id: &str) -> Result<(), ApiError> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))
    }

    pub async fn engine(&self, session_id: &str) -> Result<Option<Arc<RagEngine>>, ApiError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))?;
        Ok(session.engine.clone())
    }

    /// Install the engine handle. Returns false when one is already
    /// present; an installed handle is never replaced.
    pub async fn install_engine(
        &self,
        session_id: &str,
        engine: Arc<RagEngine>,
    ) -> Result<bool, ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))?;
        if session.engine.is_some() {
            return Ok(false);
        }
        session.engine = Some(engine);
        Ok(true)
    }

    /// Commit one chat turn: the user message followed by the
    /// assistant message, appended together.
    pub async fn append_turn(
        &self,
        session_id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))?;
        session.transcript.push(user);
        session.transcript.push(assistant);
        Ok(())
    }

    pub async fn messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))?;
        Ok(session.transcript.clone())
    }

    /// Empty the transcript. Works in every stage.
    pub async fn clear_messages(&self, session_id: &str) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))?;
        session.transcript.clear();
        Ok(())
    }

    pub async fn record_loaded(
        &self,
        session_id: &str,
        added_documents: usize,
    ) -> Result<(), ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))?;
        if added_documents > 0 {
            session.documents_loaded = true;
            session.document_count += added_documents;
        }
        Ok(())
    }
}
