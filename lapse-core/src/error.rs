//! Error types for the response cache.

use thiserror::Error;

/// Errors from the explicit JSON helpers of [`ResponseCache`](crate::ResponseCache).
///
/// Plain store operations never fail; only encoding and decoding payloads can.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The value could not be encoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The cached payload could not be decoded into the requested type
    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
}
