//! The backing key/value store seam.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use metafield_model::StorageEntry;
use metafield_types::{OwnerId, StorageKey};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// One stored `(owner, key) -> value` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRow {
    pub owner: OwnerId,
    pub key: StorageKey,
    pub value: String,
}

/// A flat store of string values keyed by `(owner, key)`.
///
/// Values are opaque; the store never interprets keys beyond prefix
/// matching.
pub trait MetaStore: Send + Sync {
    /// Reads one value.
    fn get(&self, owner: OwnerId, key: &StorageKey) -> StorageResult<Option<String>>;

    /// Inserts or overwrites one value.
    fn upsert(&self, owner: OwnerId, key: &StorageKey, value: &str) -> StorageResult<()>;

    /// Deletes one value; deleting a missing key is not an error.
    fn delete(&self, owner: OwnerId, key: &StorageKey) -> StorageResult<()>;

    /// Lists rows of `owner` whose key starts with `prefix`, sorted by key.
    fn scan_prefix(&self, owner: OwnerId, prefix: &str) -> StorageResult<Vec<MetaRow>>;

    /// Deletes `stale` then writes `entries`, as one unit where the backend
    /// supports it.
    fn replace(&self, owner: OwnerId, stale: &[StorageKey], entries: &[StorageEntry]) -> StorageResult<()> {
        for key in stale {
            self.delete(owner, key)?;
        }
        for entry in entries {
            self.upsert(owner, &entry.key, &entry.value)?;
        }
        Ok(())
    }
}

/// In-process store, mostly for tests and one-shot tools.
#[derive(Debug, Default)]
pub struct MemoryMetaStore {
    rows: Mutex<BTreeMap<(OwnerId, StorageKey), String>>,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> StorageResult<MutexGuard<'_, BTreeMap<(OwnerId, StorageKey), String>>> {
        self.rows.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Every row, sorted by owner then key.
    pub fn dump(&self) -> StorageResult<Vec<MetaRow>> {
        Ok(self
            .rows()?
            .iter()
            .map(|((owner, key), value)| MetaRow {
                owner: *owner,
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }
}

impl MetaStore for MemoryMetaStore {
    fn get(&self, owner: OwnerId, key: &StorageKey) -> StorageResult<Option<String>> {
        Ok(self.rows()?.get(&(owner, key.clone())).cloned())
    }

    fn upsert(&self, owner: OwnerId, key: &StorageKey, value: &str) -> StorageResult<()> {
        self.rows()?.insert((owner, key.clone()), value.to_string());
        Ok(())
    }

    fn delete(&self, owner: OwnerId, key: &StorageKey) -> StorageResult<()> {
        self.rows()?.remove(&(owner, key.clone()));
        Ok(())
    }

    fn scan_prefix(&self, owner: OwnerId, prefix: &str) -> StorageResult<Vec<MetaRow>> {
        let start = (owner, StorageKey::from_raw(prefix));
        Ok(self
            .rows()?
            .range(start..)
            .take_while(|((row_owner, key), _)| *row_owner == owner && key.as_str().starts_with(prefix))
            .map(|((row_owner, key), value)| MetaRow {
                owner: *row_owner,
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    fn replace(&self, owner: OwnerId, stale: &[StorageKey], entries: &[StorageEntry]) -> StorageResult<()> {
        let mut rows = self.rows()?;
        for key in stale {
            rows.remove(&(owner, key.clone()));
        }
        for entry in entries {
            rows.insert((owner, entry.key.clone()), entry.value.clone());
        }
        Ok(())
    }
}
