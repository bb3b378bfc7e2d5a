//! Save tokens (nonces).
//!
//! A token is the truncated HMAC-SHA256 of `"{tick}|{action}"` under the
//! process secret, hex encoded. Time is cut into ticks of half the token
//! lifetime; a token verifies during the tick it was created in and the one
//! after, so its real lifetime is between one half and one full lifetime.
//! Verification never consumes a token.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};
use crate::key::SecretKey;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of MAC kept in a token (hex doubles the length).
pub const TOKEN_BYTES: usize = 10;

/// Default token lifetime: one day.
pub const DEFAULT_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// How old a verified token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAge {
    /// Created during the current tick.
    Fresh,
    /// Created during the previous tick.
    Aging,
}

/// Creates and verifies action-bound tokens.
pub trait NonceService: Send + Sync {
    /// Creates a token for `action`.
    fn create_token(&self, action: &str) -> String;

    /// Checks `token` against `action`. `None` means invalid or expired.
    fn verify_token(&self, token: &str, action: &str) -> Option<TokenAge>;
}

/// Source of the current Unix time in seconds.
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

/// HMAC-SHA256 token service.
#[derive(Clone)]
pub struct HmacNonceService {
    keyed: HmacSha256,
    lifetime_secs: i64,
    clock: Clock,
}

impl std::fmt::Debug for HmacNonceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacNonceService")
            .field("keyed", &"[REDACTED]")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}

impl HmacNonceService {
    /// Creates a service with the default one-day lifetime.
    pub fn new(secret: &SecretKey) -> CryptoResult<Self> {
        let keyed = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(Self {
            keyed,
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            clock: system_clock,
        })
    }

    /// Overrides the token lifetime; must be at least two seconds.
    pub fn with_lifetime(mut self, lifetime_secs: i64) -> CryptoResult<Self> {
        if lifetime_secs < 2 {
            return Err(CryptoError::InvalidLifetime(lifetime_secs));
        }
        self.lifetime_secs = lifetime_secs;
        Ok(self)
    }

    /// Overrides the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Tick number for a Unix time.
    pub fn tick_at(&self, now: i64) -> i64 {
        let half = self.lifetime_secs / 2;
        now.div_euclid(half) + i64::from(now.rem_euclid(half) != 0)
    }

    fn mac(&self, tick: i64, action: &str) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(tick.to_string().as_bytes());
        mac.update(b"|");
        mac.update(action.as_bytes());
        mac
    }

    /// Creates a token as of Unix time `now`.
    pub fn create_token_at(&self, action: &str, now: i64) -> String {
        let tag = self.mac(self.tick_at(now), action).finalize().into_bytes();
        hex::encode(&tag[..TOKEN_BYTES])
    }

    /// Verifies a token as of Unix time `now`.
    pub fn verify_token_at(&self, token: &str, action: &str, now: i64) -> Option<TokenAge> {
        let Ok(bytes) = hex::decode(token.trim()) else {
            debug!("Rejecting malformed token for action {}", action);
            return None;
        };
        if bytes.len() != TOKEN_BYTES {
            debug!("Rejecting token of {} bytes for action {}", bytes.len(), action);
            return None;
        }
        let tick = self.tick_at(now);
        if self.mac(tick, action).verify_truncated_left(&bytes).is_ok() {
            return Some(TokenAge::Fresh);
        }
        if self.mac(tick - 1, action).verify_truncated_left(&bytes).is_ok() {
            return Some(TokenAge::Aging);
        }
        None
    }
}

impl NonceService for HmacNonceService {
    fn create_token(&self, action: &str) -> String {
        self.create_token_at(action, (self.clock)())
    }

    fn verify_token(&self, token: &str, action: &str) -> Option<TokenAge> {
        self.verify_token_at(token, action, (self.clock)())
    }
}
