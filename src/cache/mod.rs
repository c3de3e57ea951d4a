//! # Token Cache Module
//!
//! In-memory, time-expiring key-value store for the token-relay state. The
//! cache holds at most three entries, addressed by the fixed keys exported
//! from this module:
//!
//! - [`AUTH_CODE_KEY`]: the authorization code received from the identity
//!   provider, written on every login attempt (last-write-wins)
//! - [`ACCESS_TOKEN_KEY`]: the bearer token obtained from the exchange
//! - [`EXPIRES_IN_KEY`]: the provider-reported token lifetime, kept as the
//!   string the provider sent
//!
//! Each entry carries its own expiration timestamp set at insertion. Reads of
//! absent or expired entries report a miss. A background task is expected to
//! call [`TokenCache::cleanup`] periodically to drop expired entries; readers
//! never observe them either way.
//!
//! The cache is owned by the server startup path and handed to the forwarder
//! and handlers as an `Arc<TokenCache>`; it is safe for any number of
//! concurrent readers and writers and lives for the process lifetime.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache key for the most recently received authorization code
pub const AUTH_CODE_KEY: &str = "authCode";
/// Cache key for the access token obtained from the exchange
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Cache key for the provider-reported token lifetime
pub const EXPIRES_IN_KEY: &str = "expiresIn";

/// Default time-to-live for cache entries, in seconds
pub const DEFAULT_TOKEN_CACHE_TTL_SECS: u64 = 300;
/// Default interval between cleanup sweeps, in seconds
pub const DEFAULT_CACHE_CLEANUP_INTERVAL_SECS: u64 = 600;

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// In-memory expiring cache for the relay's token state
#[derive(Debug)]
pub struct TokenCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl TokenCache {
    /// Create a new cache whose entries expire after `ttl_secs` seconds
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Insert or replace a value, resetting its TTL
    pub async fn set(&self, key: &str, value: String) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
    }

    /// Get a value if it exists and has not expired
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        if let Some(entry) = entries.get(key) {
            if Instant::now() < entry.expires_at {
                return Some(entry.value.clone());
            }
        }
        None
    }

    /// Drop expired entries
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| now < entry.expires_at);
    }
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////
