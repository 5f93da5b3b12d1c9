//! Upstream Configuration
//!
//! Defines how each backend inference provider is reached.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_path() -> String {
    "/chat/completions".to_string()
}

/// Configuration for a single upstream backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL for the API
    pub base_url: String,

    /// Request path appended to the base URL
    #[serde(default = "default_path")]
    pub path: String,

    /// Environment variable name for the backend API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Optional environment variable for a custom base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_env: Option<String>,

    /// Additional headers to send with requests
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Payload key renames (e.g., max_tokens -> max_completion_tokens)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub param_mappings: HashMap<String, String>,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: default_path(),
            api_key_env: None,
            api_base_env: None,
            headers: HashMap::new(),
            param_mappings: HashMap::new(),
        }
    }

    /// Get the effective base URL (from env var if configured, otherwise default)
    pub fn get_base_url(&self) -> String {
        if let Some(env_var) = &self.api_base_env {
            if let Ok(url) = std::env::var(env_var) {
                return url;
            }
        }
        self.base_url.clone()
    }

    /// Full endpoint URL for inference calls
    pub fn endpoint(&self) -> String {
        let base = self.get_base_url();
        let base = base.trim_end_matches('/');
        if self.path.is_empty() {
            base.to_string()
        } else if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        }
    }

    /// Backend API key, if one is configured and present in the environment
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|env_var| std::env::var(env_var).ok())
            .filter(|key| !key.is_empty())
    }

    /// Apply parameter mappings to an outbound payload
    pub fn apply_param_mappings(&self, params: &mut serde_json::Value) {
        if let Some(obj) = params.as_object_mut() {
            for (from, to) in &self.param_mappings {
                if let Some(value) = obj.remove(from) {
                    obj.insert(to.clone(), value);
                }
            }
        }
    }
}
