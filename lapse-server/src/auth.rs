//! API key check applied to every incoming request.
//!
//! Enabled only when `LAPSE_API_KEY` is set.

use subtle::ConstantTimeEq;
use tonic::service::Interceptor;
use tonic::{Request, Status};

/// The metadata key carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests whose `x-api-key` does not match the configured key
#[derive(Clone)]
pub struct ApiKeyGuard {
    expected: Option<String>,
}

impl ApiKeyGuard {
    /// `None` lets every request through
    pub fn new(expected: Option<String>) -> Self {
        Self { expected }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }
}

// Only the length check leaks timing, and key length is not secret.
fn keys_match(provided: &str, expected: &str) -> bool {
    provided.len() == expected.len() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

impl Interceptor for ApiKeyGuard {
    fn call(&mut self, req: Request<()>) -> Result<Request<()>, Status> {
        let Some(expected) = &self.expected else {
            return Ok(req);
        };

        let Some(provided) = req.metadata().get(API_KEY_HEADER) else {
            tracing::warn!("Missing API key in request");
            return Err(Status::unauthenticated("Missing API key"));
        };

        let provided = provided.to_str().map_err(|_| {
            tracing::warn!("Non-ASCII API key in request");
            Status::unauthenticated("Invalid API key format")
        })?;

        if keys_match(provided, expected) {
            Ok(req)
        } else {
            tracing::warn!("Invalid API key provided");
            Err(Status::unauthenticated("Invalid API key"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_key(key: &str) -> Request<()> {
        let mut req = Request::new(());
        req.metadata_mut()
            .insert(API_KEY_HEADER, key.parse().unwrap());
        req
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match("secret123", "secret123"));
        assert!(!keys_match("secret123", "secret124"));
        assert!(!keys_match("secret123", "secret12"));
        assert!(keys_match("", ""));
    }

    #[test]
    fn test_disabled_guard_allows_all() {
        let mut guard = ApiKeyGuard::new(None);
        assert!(!guard.is_enabled());
        assert!(guard.call(Request::new(())).is_ok());
    }

    #[test]
    fn test_valid_api_key() {
        let mut guard = ApiKeyGuard::new(Some("secret123".to_string()));
        assert!(guard.call(request_with_key("secret123")).is_ok());
    }

    #[test]
    fn test_invalid_api_key() {
        let mut guard = ApiKeyGuard::new(Some("secret123".to_string()));
        let status = guard.call(request_with_key("wrong-key")).unwrap_err();
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
    }

    #[test]
    fn test_non_ascii_api_key() {
        let mut guard = ApiKeyGuard::new(Some("secret123".to_string()));
        let mut req = Request::new(());
        let value = tonic::metadata::MetadataValue::try_from(&b"secr\xe9t123"[..]).unwrap();
        req.metadata_mut().insert(API_KEY_HEADER, value);

        let status = guard.call(req).unwrap_err();
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert!(status.message().contains("format"));
    }

    #[test]
    fn test_missing_api_key() {
        let mut guard = ApiKeyGuard::new(Some("secret123".to_string()));
        let status = guard.call(Request::new(())).unwrap_err();
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert!(status.message().contains("Missing"));
    }
}
