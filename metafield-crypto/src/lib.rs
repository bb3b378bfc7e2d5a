//! Save-token layer for Metafield.
//!
//! Provides the process-wide [`SecretKey`] and the [`NonceService`] used to
//! authorize save requests:
//! - tokens are bound to an action string (a container's nonce name)
//! - verification is pure: no state is kept, tokens can be checked any
//!   number of times until they age out

mod error;
mod key;
mod nonce;

pub use error::{CryptoError, CryptoResult};
pub use key::{KEY_SIZE, KdfParams, SALT_SIZE, SecretKey};
pub use nonce::{
    Clock, DEFAULT_LIFETIME_SECS, HmacNonceService, NonceService, TOKEN_BYTES, TokenAge,
};
