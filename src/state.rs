use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, ConfigService};
use crate::rag::EngineConfig;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub sessions: SessionStore,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn initialize() -> anyhow::Result<Arc<Self>> {
        Ok(Self::with_paths(Arc::new(AppPaths::new())))
    }

    pub fn with_paths(paths: Arc<AppPaths>) -> Arc<Self> {
        let config = ConfigService::new(paths.clone());
        let sessions = SessionStore::new();
        let started_at = Utc::now();

        Arc::new(AppState {
            paths,
            config,
            sessions,
            started_at,
        })
    }

    /// Engine tuning from `rag.*` config keys, defaults otherwise.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(size) = self.config.get_usize(&["rag", "chunk_size"]) {
            config.chunk.chunk_size = size;
        }
        if let Some(overlap) = self.config.get_usize(&["rag", "chunk_overlap"]) {
            config.chunk.chunk_overlap = overlap;
        }
        if let Some(top_k) = self.config.get_usize(&["rag", "top_k"]) {
            config.top_k = top_k;
        }
        if let Some(max) = self.config.get_usize(&["rag", "max_context_chars"]) {
            config.max_context_chars = max;
        }
        config
    }
}
