//! Configuration Loader
//!
//! Handles loading and layering gateway configuration from multiple sources.

use crate::config::gateway::{ConfigLayer, GatewayConfig};
use crate::error::{GatewayError, Result};
use std::path::{Path, PathBuf};

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: GatewayConfig,
}

impl ConfigLoader {
    /// Create a new config loader and load from default locations
    pub fn new() -> Result<Self> {
        let mut loader = Self::builtin()?;

        // File system layers can override built-ins
        loader.load_from_default_paths()?;
        loader.config.validate()?;

        Ok(loader)
    }

    /// Create a loader with a specific config file layered over the built-ins
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self::builtin()?;
        loader.load_from_file(path)?;
        loader.config.validate()?;

        Ok(loader)
    }

    /// Built-in defaults only
    pub fn builtin() -> Result<Self> {
        let defaults = include_str!("../../gateway.json");
        let config: GatewayConfig = serde_json::from_str(defaults).map_err(|e| {
            GatewayError::Config(format!("Failed to parse built-in gateway.json: {}", e))
        })?;

        Ok(Self { config })
    }

    /// Load configuration from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }

        Ok(())
    }

    /// Get list of config paths to check, lowest precedence first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".modelgate").join("gateway.json"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("modelgate").join("gateway.json"));
        }

        paths.push(PathBuf::from("modelgate.json"));

        if let Ok(custom_path) = std::env::var("MODELGATE_CONFIG_PATH") {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    /// Load configuration from a specific file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let layer: ConfigLayer = serde_json::from_str(&content).map_err(|e| {
            GatewayError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "loaded configuration layer");
        self.merge_layer(layer);
        Ok(())
    }

    /// Merge a layer into the current config (later layers override earlier)
    fn merge_layer(&mut self, layer: ConfigLayer) {
        if let Some(admission) = layer.admission {
            self.config.admission = admission;
        }
        if let Some(timeout) = layer.upstream_timeout_secs {
            self.config.upstream_timeout_secs = timeout;
        }
        if let Some(defaults) = layer.defaults {
            self.config.defaults = defaults;
        }
        if let Some(routing) = layer.routing {
            self.config.routing = routing;
        }

        self.config.models.extend(layer.models);
        self.config.upstreams.extend(layer.upstreams);
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> GatewayConfig {
        self.config
    }
}
