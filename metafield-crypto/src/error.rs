//! Error types for the token layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while building the token service.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Secret could not be decoded.
    #[error("invalid secret encoding: {0}")]
    InvalidEncoding(String),

    /// Token lifetime too short to split into two ticks.
    #[error("invalid token lifetime: {0} seconds")]
    InvalidLifetime(i64),
}
