//! Key Store Module
//!
//! Interface to the API key / quota store and an in-process implementation.

pub mod memory;

pub use memory::{InMemoryKeyStore, KeyEntry, UsageSnapshot};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the store knows about an API key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub valid: bool,

    /// Authoritative tier name, if the store assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,

    /// User the key's quota is charged to; overrides the id embedded in the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Remaining requests of the owning user; absent when there is no hard quota
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_remaining: Option<i64>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyStoreError {
    /// Store could not be reached
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    /// Conditional decrement refused because nothing is left
    #[error("quota exhausted for user '{0}'")]
    Exhausted(String),
}

/// Key-value lookup service holding credentials and quota counters.
///
/// Implementations must make `decrement` atomic per user: concurrent calls for
/// the same user never take the counter below zero.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Look up an API key; `Ok(None)` means the key is unknown
    async fn lookup(&self, api_key: &str) -> Result<Option<KeyRecord>, KeyStoreError>;

    /// Consume one request for `user_id`.
    ///
    /// Returns the new remaining count, or `None` when the user has no hard
    /// quota (only the request counter moves).
    async fn decrement(&self, user_id: &str) -> Result<Option<i64>, KeyStoreError>;
}
