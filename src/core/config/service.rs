use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "bearer",
    "access_key",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "total_tokens", "tokens"];

/// Read-only configuration: `config.yml` merged with `secrets.yaml`.
///
/// The secrets file is where a preconfigured hosted-API credential lives
/// (`gemini.api_key`); entering the credential per session via the API is
/// the other supported path.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("DOCCHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn load_config(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.paths.secrets_path);
        deep_merge(&public_config, &secrets_config)
    }

    /// Configuration view safe to return over the API.
    pub fn redacted_config(&self) -> Value {
        redact_sensitive_values(&self.load_config())
    }

    /// The preconfigured credential, if any.
    pub fn configured_api_key(&self) -> Option<String> {
        self.get_str(&["gemini", "api_key"])
    }

    pub fn get_str(&self, path: &[&str]) -> Option<String> {
        let config = self.load_config();
        let mut current = &config;
        for key in path {
            current = current.get(key)?;
        }
        current.as_str().map(|s| s.to_string())
    }

    pub fn get_usize(&self, path: &[&str]) -> Option<usize> {
        let config = self.load_config();
        let mut current = &config;
        for key in path {
            current = current.get(key)?;
        }
        current.as_u64().map(|v| v as usize)
    }

    pub fn cors_allowed_origins(&self) -> Vec<String> {
        self.load_config()
            .get("server")
            .and_then(|server| server.get("cors_allowed_origins"))
            .and_then(|value| value.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str())
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| item.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(_) => Value::Object(Map::new()),
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_lets_secrets_override_public_values() {
        let base = json!({
            "gemini": { "base_url": "http://example", "api_key": null },
            "rag": { "top_k": 5 }
        });
        let secrets = json!({
            "gemini": { "api_key": "sk-test" }
        });

        let merged = deep_merge(&base, &secrets);

        assert_eq!(merged["gemini"]["api_key"], json!("sk-test"));
        assert_eq!(merged["gemini"]["base_url"], json!("http://example"));
        assert_eq!(merged["rag"]["top_k"], json!(5));
    }

    #[test]
    fn redaction_masks_credentials_only() {
        let input = json!({
            "gemini": { "api_key": "sk-test", "completion_model": "m" },
            "rag": { "max_tokens": 42 }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(redacted["gemini"]["api_key"], json!("****"));
        assert_eq!(redacted["gemini"]["completion_model"], json!("m"));
        assert_eq!(redacted["rag"]["max_tokens"], json!(42));
    }

    #[test]
    fn configured_api_key_reads_secrets_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = Arc::new(AppPaths::rooted_at(dir.path()));
        fs::write(&paths.secrets_path, "gemini:\n  api_key: sk-from-secrets\n")
            .expect("write secrets");

        let config = ConfigService::new(paths);
        assert_eq!(
            config.configured_api_key().as_deref(),
            Some("sk-from-secrets")
        );
    }
}
