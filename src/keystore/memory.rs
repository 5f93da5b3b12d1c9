//! In-Memory Key Store
//!
//! Process-local key store with per-user usage tracking. Suitable for
//! development, tests and single-instance deployments.

use super::{KeyRecord, KeyStore, KeyStoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Registration of a single API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub valid: bool,
    pub tier: Option<String>,
    /// User the key's quota is charged to
    pub user_id: Option<String>,
}

impl KeyEntry {
    pub fn valid() -> Self {
        Self {
            valid: true,
            tier: None,
            user_id: None,
        }
    }

    pub fn revoked() -> Self {
        Self {
            valid: false,
            ..Self::valid()
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Per-user usage state
#[derive(Debug, Clone, Default)]
struct UserUsage {
    /// Hard quota; `None` means unmetered
    remaining: Option<i64>,

    /// Total requests consumed
    requests: u64,

    /// Last successful consumption
    last_request_at: Option<DateTime<Utc>>,
}

/// Read-only view of a user's usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub remaining: Option<i64>,
    pub requests: u64,
    pub last_request_at: Option<DateTime<Utc>>,
}

/// Key store backed by process memory
#[derive(Debug)]
pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<String, KeyEntry>>,
    usage: Mutex<HashMap<String, UserUsage>>,
    available: AtomicBool,
    lookups: AtomicUsize,
    decrements: AtomicUsize,
}

impl Default for InMemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            usage: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            lookups: AtomicUsize::new(0),
            decrements: AtomicUsize::new(0),
        }
    }

    /// Register (or replace) an API key
    pub fn insert_key(&self, api_key: impl Into<String>, entry: KeyEntry) {
        self.keys.write().insert(api_key.into(), entry);
    }

    /// Builder form of [`insert_key`](Self::insert_key)
    pub fn with_key(self, api_key: impl Into<String>, entry: KeyEntry) -> Self {
        self.insert_key(api_key, entry);
        self
    }

    /// Set a hard quota for a user
    pub fn set_quota(&self, user_id: impl Into<String>, remaining: i64) {
        self.usage.lock().entry(user_id.into()).or_default().remaining = Some(remaining);
    }

    /// Builder form of [`set_quota`](Self::set_quota)
    pub fn with_quota(self, user_id: impl Into<String>, remaining: i64) -> Self {
        self.set_quota(user_id, remaining);
        self
    }

    /// Simulate the store going down or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Current usage of a user, if any was recorded
    pub fn usage(&self, user_id: &str) -> Option<UsageSnapshot> {
        self.usage.lock().get(user_id).map(|u| UsageSnapshot {
            remaining: u.remaining,
            requests: u.requests,
            last_request_at: u.last_request_at,
        })
    }

    /// Number of `lookup` calls served (including failed ones)
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of `decrement` calls served (including failed ones)
    pub fn decrement_count(&self) -> usize {
        self.decrements.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), KeyStoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KeyStoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ))
        }
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn lookup(&self, api_key: &str) -> Result<Option<KeyRecord>, KeyStoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let entry = match self.keys.read().get(api_key) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };

        let quota_remaining = entry
            .user_id
            .as_deref()
            .and_then(|user| self.usage.lock().get(user).and_then(|u| u.remaining));

        Ok(Some(KeyRecord {
            valid: entry.valid,
            tier: entry.tier,
            user_id: entry.user_id,
            quota_remaining,
        }))
    }

    async fn decrement(&self, user_id: &str) -> Result<Option<i64>, KeyStoreError> {
        self.decrements.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        // Check and decrement under one lock
        let mut usage = self.usage.lock();
        let entry = usage.entry(user_id.to_string()).or_default();

        let remaining = match entry.remaining {
            Some(left) if left <= 0 => {
                return Err(KeyStoreError::Exhausted(user_id.to_string()));
            }
            Some(left) => Some(left - 1),
            None => None,
        };

        entry.remaining = remaining;
        entry.requests += 1;
        entry.last_request_at = Some(Utc::now());

        Ok(remaining)
    }
}
