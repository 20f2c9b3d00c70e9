use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl BackendError {
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        BackendError::Transport(err.to_string())
    }
}

/// The two functions the retrieval engine is parameterized with at
/// construction: answer synthesis and text embedding.
#[async_trait]
pub trait LanguageBackend: Send + Sync {
    /// return the backend name (e.g. "gemini")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Result<String, BackendError>;

    /// generate embeddings, one vector per input
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, BackendError>;
}
