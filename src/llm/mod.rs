mod backend;
mod gemini;

pub use backend::{BackendError, LanguageBackend};
pub use gemini::{
    GeminiBackend, DEFAULT_BASE_URL, DEFAULT_COMPLETION_MODEL, DEFAULT_EMBEDDING_MODEL,
};
