use std::time::Duration;

/// Default lifetime of a one-time password (10 minutes)
pub const DEFAULT_OTP_TTL: Duration = Duration::from_secs(600);

/// Default number of digits in a generated one-time password
pub const DEFAULT_OTP_LENGTH: usize = 6;

/// Longest one-time password `generate_otp` will produce
pub const MAX_OTP_LENGTH: usize = 64;

/// Configuration for an [`OtpStore`](crate::OtpStore)
///
/// # Example
///
/// ```rust
/// use lapse_core::OtpConfig;
/// use std::time::Duration;
///
/// let config = OtpConfig::default()
///     .with_ttl(Duration::from_secs(300))
///     .with_code_length(8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    /// How long a stored code stays valid (default: 600 seconds)
    pub ttl: Duration,
    /// Digits in codes produced by `generate_otp` (default: 6)
    pub code_length: usize,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_OTP_TTL,
            code_length: DEFAULT_OTP_LENGTH,
        }
    }
}

impl OtpConfig {
    /// Creates a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long stored codes remain valid
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the number of digits in generated codes, clamped to `1..=MAX_OTP_LENGTH`
    pub fn with_code_length(mut self, code_length: usize) -> Self {
        self.code_length = code_length.clamp(1, MAX_OTP_LENGTH);
        self
    }
}

/// Configuration for a [`ResponseCache`](crate::ResponseCache)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when a call does not pass one; `None` caches forever
    pub default_ttl: Option<Duration>,
}

impl CacheConfig {
    /// Creates a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL used when a call does not specify one
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }
}
