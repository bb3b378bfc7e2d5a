//! Storage layer for Metafield.
//!
//! Field trees are persisted as flat `(owner, key) -> value` rows:
//! - [`MetaStore`] is the backing store seam, with an in-memory
//!   ([`MemoryMetaStore`]) and a SQLite ([`SqliteMetaStore`]) implementation
//! - [`MetaPersister`] turns trees into rows and rows back into trees using
//!   the key codec from `metafield-model`

mod error;
mod persister;
mod sqlite;
mod store;

pub use error::{StorageError, StorageResult};
pub use persister::{LoadReport, MetaPersister, SaveSummary};
pub use sqlite::SqliteMetaStore;
pub use store::{MemoryMetaStore, MetaRow, MetaStore};
