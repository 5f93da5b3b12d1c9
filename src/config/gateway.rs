//! Gateway Configuration
//!
//! Defines the configuration schema for admission, routing and upstreams.

use crate::config::upstream::UpstreamConfig;
use crate::error::{GatewayError, Result};
use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Credential fallback policy
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Upper bound on a single upstream call, in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Outbound payload defaults
    #[serde(default)]
    pub defaults: PayloadDefaults,

    /// Content-based routing policy
    pub routing: RoutingConfig,

    /// Known models keyed by name
    pub models: HashMap<String, ModelConfig>,

    /// Backends keyed by upstream name
    pub upstreams: HashMap<String, UpstreamConfig>,
}

/// How the gateway treats keys the key store cannot vouch for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// Reject unknown keys and key store outages
    #[default]
    Strict,

    /// Accept well-formed keys when the key store is silent or unreachable
    Permissive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default)]
    pub mode: AdmissionMode,
}

/// Values used when the caller omits a generation parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayloadDefaults {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default)]
    pub stream: bool,
}

impl Default for PayloadDefaults {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            stream: false,
        }
    }
}

/// Model slots and prompt-length thresholds for content-based routing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Premium default
    pub flagship: String,

    /// Long prompts from premium and standard callers
    pub large_context: String,

    /// Standard default
    pub mid_tier: String,

    /// Every free-tier request
    pub free: String,

    /// Premium prompts strictly longer than this go to `large_context`
    #[serde(default = "default_premium_threshold")]
    pub premium_large_context_above: usize,

    /// Standard prompts strictly longer than this go to `large_context`
    #[serde(default = "default_standard_threshold")]
    pub standard_large_context_above: usize,
}

/// Static description of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Upstream serving this model
    pub upstream: String,

    /// Declared max-token limit
    pub max_tokens: u32,

    /// Minimum caller tier for explicit requests
    pub required_tier: Tier,
}

fn default_upstream_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f64 {
    0.7
}

fn default_premium_threshold() -> usize {
    10_000
}

fn default_standard_threshold() -> usize {
    2_000
}

impl GatewayConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Check cross references between routing slots, models and upstreams
    pub fn validate(&self) -> Result<()> {
        if self.upstream_timeout_secs == 0 {
            return Err(GatewayError::Config(
                "upstream_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut names: Vec<_> = self.models.keys().collect();
        names.sort();
        for name in names {
            let model = &self.models[name];
            if !self.upstreams.contains_key(&model.upstream) {
                return Err(GatewayError::Config(format!(
                    "model '{}' references unknown upstream '{}'",
                    name, model.upstream
                )));
            }
        }

        for (slot, model) in [
            ("flagship", &self.routing.flagship),
            ("large_context", &self.routing.large_context),
            ("mid_tier", &self.routing.mid_tier),
            ("free", &self.routing.free),
        ] {
            if !self.models.contains_key(model) {
                return Err(GatewayError::Config(format!(
                    "routing slot '{}' references unknown model '{}'",
                    slot, model
                )));
            }
        }

        for tier in Tier::ALL {
            if !self.models.values().any(|m| m.required_tier == tier) {
                return Err(GatewayError::Config(format!(
                    "no model is declared for the '{}' tier",
                    tier
                )));
            }
        }

        Ok(())
    }
}

/// One configuration layer as read from disk; absent sections leave the
/// lower layers untouched when merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub admission: Option<AdmissionConfig>,

    #[serde(default)]
    pub upstream_timeout_secs: Option<u64>,

    #[serde(default)]
    pub defaults: Option<PayloadDefaults>,

    #[serde(default)]
    pub routing: Option<RoutingConfig>,

    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    #[serde(default)]
    pub upstreams: HashMap<String, UpstreamConfig>,
}
