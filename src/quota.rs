//! Quota Enforcement
//!
//! Checks the caller's remaining quota and consumes one request from it.
//! Consumption happens at most once per admitted request attempt; nothing is
//! refunded if a later pipeline stage fails.

use crate::auth::CallerContext;
use crate::error::{GatewayError, Result};
use crate::keystore::{KeyStore, KeyStoreError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a successful quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowance {
    /// Caller could not be identified; downstream rate limiting applies
    Anonymous,

    /// One request was consumed; `remaining` is `None` for unmetered users
    Consumed { remaining: Option<i64> },

    /// Store could not record the consumption; request let through
    Unrecorded,
}

impl Allowance {
    /// Remaining quota after this request, when known
    pub fn remaining(&self) -> Option<i64> {
        match self {
            Allowance::Consumed { remaining } => *remaining,
            _ => None,
        }
    }
}

pub struct QuotaGuard {
    key_store: Arc<dyn KeyStore>,
}

impl QuotaGuard {
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self { key_store }
    }

    /// Admit the caller if quota remains and consume one request
    pub async fn check_and_consume(&self, caller: &CallerContext) -> Result<Allowance> {
        let user = caller.user_id.as_deref();

        if let Some(remaining) = caller.quota_remaining {
            if remaining <= 0 {
                let label = user.unwrap_or("anonymous");
                warn!(user = label, "user has exceeded quota");
                return Err(GatewayError::QuotaExceeded(label.to_string()));
            }
        }

        let Some(user_id) = user else {
            warn!("could not identify user for quota check");
            return Ok(Allowance::Anonymous);
        };

        match self.key_store.decrement(user_id).await {
            Ok(remaining) => {
                debug!(user = user_id, ?remaining, "consumed quota");
                Ok(Allowance::Consumed { remaining })
            }
            // Another request drained the counter after our lookup
            Err(KeyStoreError::Exhausted(_)) => {
                warn!(user = user_id, "user has exceeded quota");
                Err(GatewayError::QuotaExceeded(user_id.to_string()))
            }
            Err(KeyStoreError::Unavailable(cause)) => {
                warn!(user = user_id, %cause, "quota not recorded, key store unavailable");
                Ok(Allowance::Unrecorded)
            }
        }
    }
}
