//! Configuration Module
//!
//! Handles gateway configuration loading and validation.

pub mod gateway;
pub mod loader;
pub mod upstream;

pub use gateway::{
    AdmissionConfig, AdmissionMode, ConfigLayer, GatewayConfig, ModelConfig, PayloadDefaults,
    RoutingConfig,
};
pub use loader::ConfigLoader;
pub use upstream::UpstreamConfig;
