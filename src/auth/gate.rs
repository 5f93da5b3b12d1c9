//! Authentication Gate
//!
//! Validates the caller's credential against the key store and resolves the
//! caller's identity and tier.

use crate::auth::credential::Credential;
use crate::config::AdmissionMode;
use crate::error::{GatewayError, Result};
use crate::keystore::{KeyStore, KeyStoreError};
use crate::tier::Tier;
use std::sync::Arc;
use tracing::{debug, warn};

/// Who is calling, resolved once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    /// `None` for anonymous callers
    pub user_id: Option<String>,
    pub tier: Tier,
    /// Remaining quota as reported by the key store; `None` when unmetered
    pub quota_remaining: Option<i64>,
}

impl CallerContext {
    pub fn anonymous(tier: Tier) -> Self {
        Self {
            user_id: None,
            tier,
            quota_remaining: None,
        }
    }
}

/// Credential validation in front of the pipeline
pub struct AuthGate {
    key_store: Arc<dyn KeyStore>,
    mode: AdmissionMode,
}

impl AuthGate {
    pub fn new(key_store: Arc<dyn KeyStore>, mode: AdmissionMode) -> Self {
        Self { key_store, mode }
    }

    pub fn mode(&self) -> AdmissionMode {
        self.mode
    }

    /// Authenticate a request from its raw `Authorization` header and the
    /// optional `X-User-ID` header.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
        user_id_header: Option<&str>,
    ) -> Result<CallerContext> {
        let credential = Credential::parse(authorization).inspect_err(|e| {
            warn!(error = %e, "rejected credential");
        })?;

        let mut tier = credential.tier_hint();
        let user_id = credential
            .user_id()
            .or(user_id_header)
            .map(str::to_string);

        let record = match self.key_store.lookup(credential.token()).await {
            Ok(record) => record,
            Err(KeyStoreError::Unavailable(cause)) => {
                return self.fallback(&credential, tier, user_id, || {
                    GatewayError::KeyStoreUnavailable(cause)
                });
            }
            Err(KeyStoreError::Exhausted(user)) => {
                // Not a lookup outcome; treat like an outage
                return self.fallback(&credential, tier, user_id, || {
                    GatewayError::KeyStoreUnavailable(format!(
                        "unexpected exhaustion report for '{}'",
                        user
                    ))
                });
            }
        };

        let Some(record) = record else {
            return self.fallback(&credential, tier, user_id, || {
                GatewayError::CredentialRejected("unknown API key".to_string())
            });
        };

        if !record.valid {
            warn!(key = %credential.redacted(), "key store rejected API key");
            return Err(GatewayError::CredentialRejected(
                "API key is not valid".to_string(),
            ));
        }

        // Key store tier wins over the key's embedded marker
        if let Some(name) = record.tier.as_deref() {
            match name.parse::<Tier>() {
                Ok(stored) => tier = stored,
                Err(e) => warn!(key = %credential.redacted(), error = %e, "ignoring stored tier"),
            }
        }

        // Quota is tracked against the store's owner of the key, when it names one
        let user_id = record.user_id.or(user_id);

        debug!(key = %credential.redacted(), %tier, user = ?user_id, "authenticated");

        Ok(CallerContext {
            user_id,
            tier,
            quota_remaining: record.quota_remaining,
        })
    }

    /// Admission for keys the store cannot vouch for
    fn fallback(
        &self,
        credential: &Credential,
        tier: Tier,
        user_id: Option<String>,
        reject: impl FnOnce() -> GatewayError,
    ) -> Result<CallerContext> {
        match self.mode {
            AdmissionMode::Strict => {
                let err = reject();
                warn!(key = %credential.redacted(), error = %err, "strict admission rejected key");
                Err(err)
            }
            AdmissionMode::Permissive => {
                debug!(key = %credential.redacted(), "permissive admission accepted key");
                Ok(CallerContext {
                    user_id,
                    tier,
                    quota_remaining: None,
                })
            }
        }
    }
}
