//! Error types for request handling and configuration.

use thiserror::Error;

/// Result type for request operations.
pub type RequestResult<T> = Result<T, RequestError>;

/// Errors raised while configuring or serving a container.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Field or container declaration error.
    #[error(transparent)]
    Model(#[from] metafield_model::ConfigError),

    /// Secret or token service error.
    #[error(transparent)]
    Crypto(#[from] metafield_crypto::CryptoError),

    /// Backing store error.
    #[error(transparent)]
    Storage(#[from] metafield_storage::StorageError),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON input could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsed but is not usable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The log subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}
