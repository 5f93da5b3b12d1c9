//! Upstream Call Capability
//!
//! Interface through which the dispatcher reaches backend inference providers.

use crate::api::OutboundPayload;
use async_trait::async_trait;
use thiserror::Error;

/// Raw reply from an upstream, relayed verbatim on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// No backend is configured under this name
    #[error("unknown upstream '{0}'")]
    UnknownUpstream(String),

    /// Connection, TLS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The client's own deadline elapsed
    #[error("timed out: {0}")]
    Timeout(String),
}

/// Issues a single call to a named upstream. Implementations do not retry.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn invoke(
        &self,
        upstream: &str,
        payload: &OutboundPayload,
    ) -> Result<UpstreamReply, UpstreamError>;
}
