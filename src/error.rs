//! Gateway Error Types
//!
//! Error taxonomy for the admission and routing pipeline, and its mapping onto
//! caller-facing HTTP outcomes.

use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Main error type for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No `Authorization` header on the request
    #[error("missing credential")]
    MissingCredential,

    /// Header or token does not have the expected shape
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    /// Key store says the key is invalid (or unknown under strict admission)
    #[error("credential rejected: {0}")]
    CredentialRejected(String),

    /// Key store could not be reached under strict admission
    #[error("key store unavailable: {0}")]
    KeyStoreUnavailable(String),

    /// Caller has no quota left
    #[error("quota exceeded for user '{0}'")]
    QuotaExceeded(String),

    /// Request body is not a valid inference request
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A model or upstream reference that the deployment does not define
    #[error("routing configuration error: {0}")]
    RoutingConfig(String),

    /// Upstream call failed (transport error or non-2xx status)
    #[error("upstream '{upstream}' failed: {cause}")]
    UpstreamTransport { upstream: String, cause: String },

    /// Upstream call did not complete in time
    #[error("upstream '{upstream}' timed out after {}ms", .timeout.as_millis())]
    UpstreamTimeout { upstream: String, timeout: Duration },

    /// Bootstrap configuration errors (invalid JSON, unreadable files, bad references)
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// HTTP status code presented to the caller
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::MissingCredential
            | GatewayError::MalformedCredential(_)
            | GatewayError::CredentialRejected(_)
            | GatewayError::KeyStoreUnavailable(_) => 401,
            GatewayError::QuotaExceeded(_) => 429,
            GatewayError::BadRequest(_) => 400,
            GatewayError::RoutingConfig(_)
            | GatewayError::UpstreamTransport { .. }
            | GatewayError::UpstreamTimeout { .. }
            | GatewayError::Config(_) => 500,
        }
    }

    /// Whether the failure is attributable to the caller
    pub fn is_client_error(&self) -> bool {
        self.status() < 500
    }

    /// Render the caller-facing JSON body.
    ///
    /// Auth and quota rejections carry fixed messages so that nothing about the
    /// key store's view of the credential leaks to the caller.
    pub fn to_body(&self) -> serde_json::Value {
        match self {
            GatewayError::MissingCredential
            | GatewayError::MalformedCredential(_)
            | GatewayError::CredentialRejected(_)
            | GatewayError::KeyStoreUnavailable(_) => json!({
                "error": "Unauthorized",
                "message": "Invalid or missing API key",
            }),
            GatewayError::QuotaExceeded(_) => json!({
                "error": "Quota exceeded",
                "message": "You have exceeded your API quota",
            }),
            GatewayError::BadRequest(reason) => json!({
                "error": "Bad request",
                "message": reason,
            }),
            GatewayError::UpstreamTransport { .. } | GatewayError::UpstreamTimeout { .. } => {
                json!({
                    "error": "Upstream request failed",
                    "details": self.to_string(),
                })
            }
            GatewayError::RoutingConfig(_) | GatewayError::Config(_) => json!({
                "error": "Internal routing error",
                "details": self.to_string(),
            }),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Config(format!("JSON parsing error: {}", err))
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Config(format!("IO error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
