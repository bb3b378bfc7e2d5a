//! Core type definitions for Metafield.
//!
//! This crate defines the identity types shared by every other crate:
//! - Owner record identifiers and the record-type scope they belong to
//! - Underscore-prefixed field names and group types
//! - Flat storage keys and the path they encode
//!
//! Schema-aware decoding of keys lives in `metafield-model`; this crate only
//! knows how to format key segments and split trailing indices.

mod ids;
mod key;
mod name;

pub use ids::{OwnerId, RecordScope};
pub use key::{KeyLevel, KeyPath, StorageKey, parse_indices};
pub use name::{FieldName, GroupType};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid name {0:?}: {1}")]
    InvalidName(String, &'static str),

    #[error("invalid owner id: {0}")]
    InvalidOwnerId(String),

    #[error("invalid record scope: {0}")]
    InvalidScope(String),
}
