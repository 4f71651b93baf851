//! Server configuration read from `LAPSE_*` environment variables.

use lapse_core::{OtpConfig, MAX_OTP_LENGTH};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 50051;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be between 1 and {max}, got {value}")]
    OutOfRange {
        var: &'static str,
        value: usize,
        max: usize,
    },

    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Required value of the `x-api-key` header; `None` disables authentication
    pub api_key: Option<String>,
    pub otp: OtpConfig,
}

impl ServerConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup
    ///
    /// Recognised variables:
    /// - `LAPSE_HOST` (default `127.0.0.1`)
    /// - `LAPSE_PORT` (default `50051`)
    /// - `LAPSE_API_KEY` (optional)
    /// - `LAPSE_OTP_TTL` in seconds (default `600`)
    /// - `LAPSE_OTP_LENGTH` (default `6`, at most `MAX_OTP_LENGTH`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("LAPSE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_number(&lookup, "LAPSE_PORT")?.unwrap_or(DEFAULT_PORT);

        let addr_text = format!("{host}:{port}");
        let addr = addr_text
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(addr_text))?;

        let api_key = lookup("LAPSE_API_KEY").filter(|key| !key.is_empty());

        let mut otp = OtpConfig::default();
        if let Some(ttl) = parse_number::<u64, _>(&lookup, "LAPSE_OTP_TTL")? {
            otp = otp.with_ttl(Duration::from_secs(ttl));
        }
        if let Some(length) = parse_number::<usize, _>(&lookup, "LAPSE_OTP_LENGTH")? {
            if !(1..=MAX_OTP_LENGTH).contains(&length) {
                return Err(ConfigError::OutOfRange {
                    var: "LAPSE_OTP_LENGTH",
                    value: length,
                    max: MAX_OTP_LENGTH,
                });
            }
            otp = otp.with_code_length(length);
        }

        Ok(Self { addr, api_key, otp })
    }
}

fn parse_number<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.addr, "127.0.0.1:50051".parse::<SocketAddr>().unwrap());
        assert_eq!(config.api_key, None);
        assert_eq!(config.otp, OtpConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LAPSE_HOST", "0.0.0.0"),
            ("LAPSE_PORT", "6000"),
            ("LAPSE_API_KEY", "secret123"),
            ("LAPSE_OTP_TTL", "300"),
            ("LAPSE_OTP_LENGTH", "8"),
        ])
        .unwrap();

        assert_eq!(config.addr, "0.0.0.0:6000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.api_key.as_deref(), Some("secret123"));
        assert_eq!(config.otp.ttl, Duration::from_secs(300));
        assert_eq!(config.otp.code_length, 8);
    }

    #[test]
    fn test_empty_api_key_disables_auth() {
        let config = config_from(&[("LAPSE_API_KEY", "")]).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_invalid_port() {
        let err = config_from(&[("LAPSE_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: "LAPSE_PORT", .. }));
    }

    #[test]
    fn test_invalid_otp_ttl() {
        let err = config_from(&[("LAPSE_OTP_TTL", "-5")]).unwrap_err();
        assert!(err.to_string().contains("LAPSE_OTP_TTL"));
    }

    #[test]
    fn test_otp_length_out_of_range() {
        let err = config_from(&[("LAPSE_OTP_LENGTH", "100000000000")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange { var: "LAPSE_OTP_LENGTH", value: 100_000_000_000, .. }
        ));

        let err = config_from(&[("LAPSE_OTP_LENGTH", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { value: 0, .. }));

        let config = config_from(&[("LAPSE_OTP_LENGTH", &MAX_OTP_LENGTH.to_string())]).unwrap();
        assert_eq!(config.otp.code_length, MAX_OTP_LENGTH);
    }

    #[test]
    fn test_invalid_host() {
        let err = config_from(&[("LAPSE_HOST", "not a host")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress(_)));
    }
}
