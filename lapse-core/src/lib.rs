//! # Lapse Core
//!
//! In-memory key-value stores whose entries expire.
//!
//! ## Features
//!
//! - Thread-safe storage using `DashMap`
//! - Lazy expiry: expired entries are removed when their key is next read
//! - Injectable [`Clock`] so tests can move time forward without sleeping
//! - Ready-made specializations: [`ResponseCache`], [`OtpStore`], [`TokenBlacklist`]
//!
//! Every store is an explicitly constructed value. Two stores never share data
//! unless one is a clone of the other.
//!
//! ## Example
//!
//! ```rust
//! use lapse_core::{ExpiringStore, OtpStore, TokenBlacklist, hash_token};
//!
//! let store: ExpiringStore<String> = ExpiringStore::new();
//! store.set("user:123", "John Doe".to_string(), Some(60));
//! assert!(store.get("user:123").is_some());
//!
//! let otps = OtpStore::new();
//! otps.set_otp("a@b.com", "123456");
//! assert!(otps.verify_otp("a@b.com", "123456"));
//!
//! let blacklist = TokenBlacklist::new();
//! blacklist.blacklist_token(&hash_token("eyJhbGciOi..."), 3600);
//! assert!(blacklist.is_token_blacklisted(&hash_token("eyJhbGciOi...")));
//! ```

mod blacklist;
mod cache;
mod clock;
mod config;
mod entry;
mod error;
mod otp;
mod store;

pub use blacklist::{hash_token, TokenBlacklist};
pub use cache::ResponseCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, OtpConfig, DEFAULT_OTP_LENGTH, DEFAULT_OTP_TTL, MAX_OTP_LENGTH};
pub use entry::Entry;
pub use error::CacheError;
pub use otp::OtpStore;
pub use store::ExpiringStore;

// Re-export search constants for use by server layer
pub use store::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
