//! HTTP Upstream
//!
//! reqwest-backed upstream client. One POST per call; no retries.

use crate::api::OutboundPayload;
use crate::client::upstream::{UpstreamClient, UpstreamError, UpstreamReply};
use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Prepared view of one backend
struct Backend {
    endpoint: String,
    headers: HeaderMap,
    config: UpstreamConfig,
}

/// HTTP client for the configured upstreams
pub struct HttpUpstream {
    /// Inner reqwest client
    client: Client,

    /// Backends keyed by upstream name
    backends: HashMap<String, Backend>,
}

impl HttpUpstream {
    /// Create a client for the given upstreams; `timeout` bounds each call
    pub fn new(upstreams: &HashMap<String, UpstreamConfig>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let mut backends = HashMap::new();
        for (name, config) in upstreams {
            backends.insert(name.clone(), Self::prepare(name, config)?);
        }

        Ok(Self { client, backends })
    }

    fn prepare(name: &str, config: &UpstreamConfig) -> Result<Backend> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = config.get_api_key() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                    GatewayError::Config(format!("Invalid API key format for '{}': {}", name, e))
                })?,
            );
        } else if config.api_key_env.is_some() {
            warn!(upstream = name, "no API key found in environment");
        }

        for (key, value) in &config.headers {
            let header = HeaderName::try_from(key.as_str()).map_err(|e| {
                GatewayError::Config(format!("Invalid header '{}' for '{}': {}", key, name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                GatewayError::Config(format!("Invalid value for header '{}' on '{}': {}", key, name, e))
            })?;
            headers.insert(header, value);
        }

        Ok(Backend {
            endpoint: config.endpoint(),
            headers,
            config: config.clone(),
        })
    }

    /// Names of the configured upstreams
    pub fn upstreams(&self) -> Vec<String> {
        let mut names: Vec<_> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn invoke(
        &self,
        upstream: &str,
        payload: &OutboundPayload,
    ) -> std::result::Result<UpstreamReply, UpstreamError> {
        let backend = self
            .backends
            .get(upstream)
            .ok_or_else(|| UpstreamError::UnknownUpstream(upstream.to_string()))?;

        let mut body = serde_json::to_value(payload)
            .map_err(|e| UpstreamError::Transport(format!("failed to encode payload: {}", e)))?;
        backend.config.apply_param_mappings(&mut body);

        debug!(upstream, endpoint = %backend.endpoint, model = %payload.model, "calling upstream");

        let response = self
            .client
            .post(&backend.endpoint)
            .headers(backend.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(UpstreamReply { status, body })
    }
}

fn classify(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(err.to_string())
    } else if err.is_connect() {
        UpstreamError::Transport(format!("Connection failed: {}", err))
    } else {
        UpstreamError::Transport(err.to_string())
    }
}
