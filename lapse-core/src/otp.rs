//! One-time password storage.
//!
//! Codes are keyed by email address and expire after the configured TTL
//! (10 minutes unless overridden).

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::clock::Clock;
use crate::config::OtpConfig;
use crate::store::ExpiringStore;

/// Expiring store of one-time passwords keyed by email
#[derive(Debug, Clone)]
pub struct OtpStore {
    codes: ExpiringStore<String>,
    config: OtpConfig,
}

impl OtpStore {
    /// Creates an OTP store with default configuration and the system clock
    pub fn new() -> Self {
        Self::with_config(OtpConfig::default())
    }

    /// Creates an OTP store with custom configuration and the system clock
    pub fn with_config(config: OtpConfig) -> Self {
        Self {
            codes: ExpiringStore::new(),
            config,
        }
    }

    /// Creates an OTP store that reads time from `clock`
    pub fn with_clock(config: OtpConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            codes: ExpiringStore::with_clock(clock),
            config,
        }
    }

    /// Produces a random numeric code of the configured length
    pub fn generate_otp(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.config.code_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    /// Stores `code` for `email` with the configured TTL, replacing any previous code
    pub fn set_otp(&self, email: &str, code: impl Into<String>) {
        self.set_otp_with_ttl(email, code, self.config.ttl);
    }

    /// Stores `code` for `email` with an explicit TTL
    pub fn set_otp_with_ttl(&self, email: &str, code: impl Into<String>, ttl: Duration) {
        self.codes.set_with_ttl(email, code.into(), Some(ttl));
    }

    /// Returns the live code for `email`, if any
    pub fn get_otp(&self, email: &str) -> Option<String> {
        self.codes.get(email)
    }

    /// Drops the code for `email`; returns whether one was stored
    pub fn delete_otp(&self, email: &str) -> bool {
        self.codes.delete(email)
    }

    /// Checks `code` against the stored code for `email`
    ///
    /// A matching code is consumed so it cannot be used twice. A mismatch leaves
    /// the stored code in place.
    pub fn verify_otp(&self, email: &str, code: &str) -> bool {
        let consumed = self
            .codes
            .take_if(email, |expected| {
                expected.len() == code.len()
                    && bool::from(expected.as_bytes().ct_eq(code.as_bytes()))
            })
            .is_some();

        if !consumed {
            tracing::debug!("OTP rejected");
        }
        consumed
    }
}

impl Default for OtpStore {
    fn default() -> Self {
        Self::new()
    }
}
