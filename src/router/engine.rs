//! Routing Engine
//!
//! Chooses the model and upstream for a request. Entitled explicit requests
//! win; everything else is routed by caller tier and prompt length.

use crate::config::RoutingConfig;
use crate::error::{GatewayError, Result};
use crate::router::policy::{ModelSpec, PolicyTable};
use crate::tier::Tier;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Where a request goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub model: String,
    pub upstream: String,
}

impl RoutingDecision {
    fn from_spec(spec: &ModelSpec) -> Self {
        Self {
            model: spec.name.clone(),
            upstream: spec.upstream.clone(),
        }
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}", self.model, self.upstream)
    }
}

/// Prompt length as used by the routing thresholds, in UTF-16 code units.
///
/// Characters outside the Basic Multilingual Plane (most emoji) count twice.
pub fn prompt_length(prompt: &str) -> usize {
    prompt.encode_utf16().count()
}

pub struct RoutingEngine {
    table: Arc<PolicyTable>,
    policy: RoutingConfig,
}

impl RoutingEngine {
    pub fn new(table: Arc<PolicyTable>, policy: RoutingConfig) -> Self {
        Self { table, policy }
    }

    pub fn table(&self) -> &PolicyTable {
        &self.table
    }

    /// Select a model for `prompt` on behalf of a caller of `tier`.
    ///
    /// An explicit model is honoured only when it exists and the caller's tier
    /// reaches its required tier; otherwise it is ignored silently.
    pub fn select(
        &self,
        prompt: &str,
        tier: Tier,
        explicit_model: Option<&str>,
    ) -> Result<RoutingDecision> {
        if let Some(name) = explicit_model.filter(|m| !m.is_empty()) {
            match self.table.lookup(name) {
                Some(spec) if tier.can_access(spec.required_tier) => {
                    debug!(model = name, %tier, "honouring explicit model");
                    return Ok(RoutingDecision::from_spec(spec));
                }
                Some(spec) => {
                    debug!(model = name, %tier, required = %spec.required_tier, "caller not entitled to explicit model");
                }
                None => debug!(model = name, "explicit model not in policy table"),
            }
        }

        let model = self.policy_model(prompt_length(prompt), tier);

        match self.table.lookup(model) {
            Some(spec) => Ok(RoutingDecision::from_spec(spec)),
            None => {
                error!(
                    target: "modelgate::config_defect",
                    model,
                    %tier,
                    "routing policy selected a model missing from the policy table"
                );
                Err(GatewayError::RoutingConfig(format!(
                    "model '{}' selected for tier '{}' is not defined",
                    model, tier
                )))
            }
        }
    }

    /// Content-based slot for a prompt of `length` code units
    fn policy_model(&self, length: usize, tier: Tier) -> &str {
        let policy = &self.policy;
        match tier {
            Tier::Premium if length > policy.premium_large_context_above => {
                policy.large_context.as_str()
            }
            Tier::Premium => policy.flagship.as_str(),
            Tier::Standard if length > policy.standard_large_context_above => {
                policy.large_context.as_str()
            }
            Tier::Standard => policy.mid_tier.as_str(),
            Tier::Free => policy.free.as_str(),
        }
    }
}
