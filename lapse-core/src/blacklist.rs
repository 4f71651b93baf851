//! Revoked token tracking.
//!
//! Tokens are stored by their SHA-256 hash until their own expiry passes, after
//! which there is nothing left to revoke.

use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::clock::Clock;
use crate::store::ExpiringStore;

/// Hashes a raw token for use as a blacklist key (SHA-256, lowercase hex)
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Expiring set of blacklisted token hashes
#[derive(Debug, Clone, Default)]
pub struct TokenBlacklist {
    hashes: ExpiringStore<()>,
}

impl TokenBlacklist {
    /// Creates an empty blacklist driven by the system clock
    pub fn new() -> Self {
        Self {
            hashes: ExpiringStore::new(),
        }
    }

    /// Creates an empty blacklist that reads time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            hashes: ExpiringStore::with_clock(clock),
        }
    }

    /// Blacklists `token_hash` for `ttl_seconds`
    ///
    /// The TTL is normally the remaining lifetime of the token itself.
    pub fn blacklist_token(&self, token_hash: &str, ttl_seconds: u64) {
        self.hashes.set(token_hash, (), Some(ttl_seconds));
    }

    /// Whether `token_hash` is currently blacklisted
    pub fn is_token_blacklisted(&self, token_hash: &str) -> bool {
        self.hashes.contains_key(token_hash)
    }

    /// Lifts a blacklist entry early; returns whether one existed
    pub fn remove(&self, token_hash: &str) -> bool {
        self.hashes.delete(token_hash)
    }

    /// Whether no hashes are tracked, counting expired ones not yet removed
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
