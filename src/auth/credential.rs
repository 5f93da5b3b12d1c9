//! API Credentials
//!
//! Parsing of `Authorization: Bearer sk-...` headers. Keys follow the
//! convention `sk-{tier}-{userId}-{random}`; tier and user id are hints only.

use crate::error::{GatewayError, Result};
use crate::tier::Tier;
use std::fmt;

/// Required authorization scheme prefix
pub const BEARER_PREFIX: &str = "Bearer ";

/// Required key prefix
pub const KEY_PREFIX: &str = "sk-";

/// Minimum key length in characters, scheme excluded
pub const MIN_KEY_LENGTH: usize = 10;

/// A well-formed API key
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Parse a raw `Authorization` header value
    pub fn parse(header: Option<&str>) -> Result<Self> {
        let header = header.ok_or(GatewayError::MissingCredential)?;

        let token = header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
            GatewayError::MalformedCredential("expected Bearer token".to_string())
        })?;

        if token.chars().count() < MIN_KEY_LENGTH {
            return Err(GatewayError::MalformedCredential(
                "API key too short".to_string(),
            ));
        }

        if !token.starts_with(KEY_PREFIX) {
            return Err(GatewayError::MalformedCredential(
                "invalid API key format".to_string(),
            ));
        }

        Ok(Self {
            token: token.to_string(),
        })
    }

    /// The key itself
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Tier marker embedded in the key, `Free` when there is none
    pub fn tier_hint(&self) -> Tier {
        if self.token.starts_with("sk-premium-") {
            Tier::Premium
        } else if self.token.starts_with("sk-standard-") {
            Tier::Standard
        } else {
            Tier::Free
        }
    }

    /// User id embedded in the key: the second `-` segment after `sk-`
    pub fn user_id(&self) -> Option<&str> {
        self.token
            .strip_prefix(KEY_PREFIX)
            .and_then(|rest| rest.split('-').nth(1))
            .filter(|id| !id.is_empty())
    }

    /// Short prefix that is safe to log
    pub fn redacted(&self) -> String {
        let visible: String = self.token.chars().take(8).collect();
        format!("{}…", visible)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.redacted())
            .finish()
    }
}
