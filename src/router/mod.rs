//! Router Module
//!
//! Model registry and routing decisions.

pub mod engine;
pub mod policy;

pub use engine::{prompt_length, RoutingDecision, RoutingEngine};
pub use policy::{ModelSpec, PolicyTable};
