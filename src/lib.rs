//! modelgate - Tier-aware LLM request routing gateway
//!
//! Authenticates inbound inference requests, enforces per-user quota, picks a
//! model from the caller's tier and prompt size, and relays the call to the
//! upstream provider serving that model.

use std::path::Path;
use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod keystore;
pub mod quota;
pub mod router;
pub mod tier;

pub use api::{GatewayRequest, GatewayResponse, InferenceRequest, Message, OutboundPayload};
pub use auth::{AuthGate, CallerContext, Credential};
pub use client::{HttpUpstream, UpstreamClient, UpstreamError, UpstreamReply};
pub use config::{AdmissionMode, ConfigLoader, GatewayConfig};
pub use dispatcher::{Dispatcher, RequestContext};
pub use error::{GatewayError, Result};
pub use keystore::{InMemoryKeyStore, KeyEntry, KeyRecord, KeyStore, KeyStoreError};
pub use quota::{Allowance, QuotaGuard};
pub use router::{ModelSpec, PolicyTable, RoutingDecision, RoutingEngine};
pub use tier::Tier;

use tracing_subscriber::EnvFilter;

/// The assembled gateway
pub struct Gateway {
    config: GatewayConfig,
    dispatcher: Dispatcher,
}

impl Gateway {
    /// Create a gateway from the default configuration layers
    pub fn new(key_store: Arc<dyn KeyStore>) -> Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let loader = ConfigLoader::new()?;
        Self::from_config(loader.into_config(), key_store)
    }

    /// Create a gateway with a custom config path layered over the built-in config
    pub fn with_config_path(path: impl AsRef<Path>, key_store: Arc<dyn KeyStore>) -> Result<Self> {
        let loader = ConfigLoader::from_path(path)?;
        Self::from_config(loader.into_config(), key_store)
    }

    /// Create a gateway that talks HTTP to the configured upstreams
    pub fn from_config(config: GatewayConfig, key_store: Arc<dyn KeyStore>) -> Result<Self> {
        config.validate()?;
        let upstream = HttpUpstream::new(&config.upstreams, config.upstream_timeout())?;
        Self::with_upstream(config, key_store, Arc::new(upstream))
    }

    /// Create a gateway with a caller-supplied upstream client
    pub fn with_upstream(
        config: GatewayConfig,
        key_store: Arc<dyn KeyStore>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Result<Self> {
        let table = Arc::new(PolicyTable::from_config(&config)?);

        let dispatcher = Dispatcher::new(
            AuthGate::new(key_store.clone(), config.admission.mode),
            QuotaGuard::new(key_store),
            RoutingEngine::new(table, config.routing.clone()),
            upstream,
            config.defaults,
            config.upstream_timeout(),
        );

        tracing::info!(
            models = config.models.len(),
            upstreams = config.upstreams.len(),
            mode = ?config.admission.mode,
            "gateway ready"
        );

        Ok(Self { config, dispatcher })
    }

    /// Handle one inbound request
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        self.dispatcher.handle(request).await
    }

    /// List known models
    pub fn models(&self) -> Vec<String> {
        self.dispatcher.router().table().names()
    }

    /// Get model info
    pub fn model_info(&self, name: &str) -> Option<ModelInfo> {
        let spec = self.dispatcher.router().table().lookup(name)?;
        let base_url = self
            .config
            .upstreams
            .get(&spec.upstream)
            .map(|u| u.get_base_url())
            .unwrap_or_default();

        Some(ModelInfo {
            name: spec.name.clone(),
            upstream: spec.upstream.clone(),
            base_url,
            max_tokens: spec.max_tokens,
            required_tier: spec.required_tier,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Model information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub upstream: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub required_tier: Tier,
}

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `modelgate=info`).
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modelgate=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| GatewayError::Config(format!("tracing init failed: {}", e)))
}
