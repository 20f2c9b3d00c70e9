use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::backend::{BackendError, LanguageBackend};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const DEFAULT_COMPLETION_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Hosted-API client speaking the OpenAI-compatible surface of the
/// Gemini endpoints. Model identifiers are fixed at construction.
#[derive(Clone)]
pub struct GeminiBackend {
    base_url: String,
    api_key: String,
    completion_model: String,
    embedding_model: String,
    client: Client,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        Self::with_models(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            DEFAULT_COMPLETION_MODEL.to_string(),
            DEFAULT_EMBEDDING_MODEL.to_string(),
        )
    }

    pub fn with_models(
        api_key: String,
        base_url: String,
        completion_model: String,
        embedding_model: String,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            completion_model,
            embedding_model,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LanguageBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Result<String, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let body = json!({
            "model": self.completion_model,
            "messages": messages,
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(BackendError::transport)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: Value = res.json().await.map_err(BackendError::transport)?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BackendError::Malformed("completion missing choices".to_string()))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(BackendError::transport)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload: Value = res.json().await.map_err(BackendError::transport)?;
        let data = payload["data"]
            .as_array()
            .ok_or_else(|| BackendError::Malformed("embeddings missing data".to_string()))?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let vals = item["embedding"]
                .as_array()
                .ok_or_else(|| BackendError::Malformed("embedding not an array".to_string()))?;
            let vec: Vec<f32> = vals
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            embeddings.push(vec);
        }

        if embeddings.len() != inputs.len() {
            return Err(BackendError::Malformed(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}
