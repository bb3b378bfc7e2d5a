//! Process configuration, read from `metafield.toml`.
//!
//! ```toml
//! [storage]
//! database_path = "meta.db"
//!
//! [nonce]
//! lifetime_secs = 86400
//! secret = "<base64, 32 bytes>"   # or passphrase + salt
//!
//! [logging]
//! level = "info"
//! ```
//!
//! `METAFIELD_DATABASE` and `METAFIELD_LOG` override the file.

use std::path::{Path, PathBuf};

use metafield_crypto::{DEFAULT_LIFETIME_SECS, HmacNonceService, KdfParams, SecretKey};
use metafield_storage::SqliteMetaStore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RequestError, RequestResult};

/// Environment variable overriding `storage.database_path`.
pub const DATABASE_ENV: &str = "METAFIELD_DATABASE";
/// Environment variable overriding `logging.level`.
pub const LOG_ENV: &str = "METAFIELD_LOG";

/// Argon2id needs at least this many salt bytes.
const MIN_SALT_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file; an in-memory database when unset.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceConfig {
    #[serde(default = "default_lifetime")]
    pub lifetime_secs: i64,
    /// Base64 encoded 32-byte secret.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub salt: Option<String>,
}

fn default_lifetime() -> i64 {
    DEFAULT_LIFETIME_SECS
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            secret: None,
            passphrase: None,
            salt: None,
        }
    }
}

impl std::fmt::Debug for NonceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("NonceConfig")
            .field("lifetime_secs", &self.lifetime_secs)
            .field("secret", &redact(&self.secret))
            .field("passphrase", &redact(&self.passphrase))
            .field("salt", &self.salt)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafieldConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub nonce: NonceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl MetafieldConfig {
    /// Parses and validates TOML text. No environment overrides are applied.
    pub fn from_toml_str(contents: &str) -> RequestResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file, applies environment overrides and validates.
    pub fn load(path: &Path) -> RequestResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a file.
    pub fn from_env() -> RequestResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup (normally the process
    /// environment). Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DATABASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.storage.database_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup(LOG_ENV).filter(|v| !v.trim().is_empty()) {
            self.logging.level = level;
        }
    }

    /// Rejects configurations that cannot produce a working token service.
    pub fn validate(&self) -> RequestResult<()> {
        let nonce = &self.nonce;
        if nonce.lifetime_secs < 2 {
            return Err(RequestError::InvalidConfig(format!(
                "nonce.lifetime_secs must be at least 2, got {}",
                nonce.lifetime_secs
            )));
        }
        match (&nonce.secret, &nonce.passphrase, &nonce.salt) {
            (Some(_), Some(_), _) => {
                return Err(RequestError::InvalidConfig(
                    "set either nonce.secret or nonce.passphrase, not both".into(),
                ));
            }
            (Some(secret), None, _) => {
                SecretKey::from_base64(secret)?;
            }
            (None, Some(_), None) => {
                return Err(RequestError::InvalidConfig("nonce.passphrase requires nonce.salt".into()));
            }
            (None, Some(_), Some(salt)) if salt.len() < MIN_SALT_LEN => {
                return Err(RequestError::InvalidConfig(format!(
                    "nonce.salt must be at least {MIN_SALT_LEN} bytes"
                )));
            }
            _ => {}
        }
        if self.logging.level.trim().is_empty() {
            return Err(RequestError::InvalidConfig("logging.level is empty".into()));
        }
        Ok(())
    }

    /// True when a secret or passphrase is set, so tokens outlive the
    /// process.
    pub fn has_persistent_secret(&self) -> bool {
        self.nonce.secret.is_some() || self.nonce.passphrase.is_some()
    }

    /// True when a database file is set, so saved rows outlive the process.
    pub fn has_persistent_store(&self) -> bool {
        self.storage.database_path.is_some()
    }

    /// The process-wide secret. Without a configured secret or passphrase a
    /// random one is generated, and tokens die with the process.
    pub fn secret_key(&self) -> RequestResult<SecretKey> {
        let nonce = &self.nonce;
        if let Some(secret) = &nonce.secret {
            return Ok(SecretKey::from_base64(secret)?);
        }
        if let (Some(passphrase), Some(salt)) = (&nonce.passphrase, &nonce.salt) {
            return Ok(SecretKey::derive(passphrase, salt.as_bytes(), &KdfParams::default())?);
        }
        warn!("No nonce secret configured, using a random per-process secret");
        Ok(SecretKey::random())
    }

    /// Builds the token service from the configured secret and lifetime.
    pub fn nonce_service(&self) -> RequestResult<HmacNonceService> {
        let service = HmacNonceService::new(&self.secret_key()?)?.with_lifetime(self.nonce.lifetime_secs)?;
        Ok(service)
    }

    /// Opens the configured store.
    pub fn open_store(&self) -> RequestResult<SqliteMetaStore> {
        let store = match &self.storage.database_path {
            Some(path) => SqliteMetaStore::new(path)?,
            None => SqliteMetaStore::open_in_memory()?,
        };
        Ok(store)
    }
}
