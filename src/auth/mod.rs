//! Authentication Module
//!
//! Credential parsing and caller resolution.

pub mod credential;
pub mod gate;

pub use credential::Credential;
pub use gate::{AuthGate, CallerContext};
