//! Policy Table
//!
//! Static registry of known models. Built once at startup and read without
//! locking for the rest of the process lifetime.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::tier::Tier;
use std::collections::{HashMap, HashSet};

/// A routable model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub upstream: String,
    pub max_tokens: u32,
    pub required_tier: Tier,
}

impl ModelSpec {
    pub fn new(
        name: impl Into<String>,
        upstream: impl Into<String>,
        max_tokens: u32,
        required_tier: Tier,
    ) -> Self {
        Self {
            name: name.into(),
            upstream: upstream.into(),
            max_tokens,
            required_tier,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    models: HashMap<String, ModelSpec>,
}

impl PolicyTable {
    /// Build a table, checking every model against the configured upstreams
    /// and that every tier has at least one model of its own.
    pub fn new<'a>(
        models: impl IntoIterator<Item = ModelSpec>,
        upstreams: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let upstreams: HashSet<&str> = upstreams.into_iter().collect();
        let mut table = HashMap::new();

        for spec in models {
            if !upstreams.contains(spec.upstream.as_str()) {
                return Err(GatewayError::Config(format!(
                    "model '{}' references unknown upstream '{}'",
                    spec.name, spec.upstream
                )));
            }
            if table.contains_key(&spec.name) {
                return Err(GatewayError::Config(format!(
                    "model '{}' declared twice",
                    spec.name
                )));
            }
            table.insert(spec.name.clone(), spec);
        }

        for tier in Tier::ALL {
            if !table.values().any(|m| m.required_tier == tier) {
                return Err(GatewayError::Config(format!(
                    "no model is declared for the '{}' tier",
                    tier
                )));
            }
        }

        Ok(Self { models: table })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let models = config.models.iter().map(|(name, model)| {
            ModelSpec::new(
                name.clone(),
                model.upstream.clone(),
                model.max_tokens,
                model.required_tier,
            )
        });
        Self::new(models, config.upstreams.keys().map(String::as_str))
    }

    pub fn lookup(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.models.keys().cloned().collect();
        names.sort();
        names
    }
}
