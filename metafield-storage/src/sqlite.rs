//! SQLite-backed store.
//!
//! Rows live in a single `postmeta` table keyed by `(owner_id, meta_key)`.
//! Prefix scans compare with `substr` rather than `LIKE`, since `_` is a
//! `LIKE` wildcard and every stored key is full of them.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use metafield_model::StorageEntry;
use metafield_types::{OwnerId, StorageKey};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{MetaRow, MetaStore};

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct SqliteMetaStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteMetaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMetaStore").finish_non_exhaustive()
    }
}

impl SqliteMetaStore {
    /// Opens (or creates) a store at the given path.
    pub fn new(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!("Opening meta store at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS postmeta (
                owner_id TEXT NOT NULL,
                meta_key TEXT NOT NULL,
                meta_value TEXT NOT NULL,
                UNIQUE(owner_id, meta_key)
            );
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Total number of rows, across owners.
    pub fn row_count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM postmeta", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| StorageError::InvalidData(format!("row count {count}")))
    }
}

fn row_owner(raw: &str) -> StorageResult<OwnerId> {
    raw.parse()
        .map_err(|_| StorageError::InvalidData(format!("invalid owner_id {raw:?}")))
}

impl MetaStore for SqliteMetaStore {
    fn get(&self, owner: OwnerId, key: &StorageKey) -> StorageResult<Option<String>> {
        let value = self
            .conn()?
            .query_row(
                "SELECT meta_value FROM postmeta WHERE owner_id = ?1 AND meta_key = ?2",
                params![owner.to_string(), key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn upsert(&self, owner: OwnerId, key: &StorageKey, value: &str) -> StorageResult<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO postmeta (owner_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
            params![owner.to_string(), key.as_str(), value],
        )?;
        Ok(())
    }

    fn delete(&self, owner: OwnerId, key: &StorageKey) -> StorageResult<()> {
        self.conn()?.execute(
            "DELETE FROM postmeta WHERE owner_id = ?1 AND meta_key = ?2",
            params![owner.to_string(), key.as_str()],
        )?;
        Ok(())
    }

    fn scan_prefix(&self, owner: OwnerId, prefix: &str) -> StorageResult<Vec<MetaRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT owner_id, meta_key, meta_value FROM postmeta
             WHERE owner_id = ?1 AND substr(meta_key, 1, length(?2)) = ?2
             ORDER BY meta_key",
        )?;
        let rows = stmt.query_map(params![owner.to_string(), prefix], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (owner_raw, key, value) = row?;
            result.push(MetaRow {
                owner: row_owner(&owner_raw)?,
                key: StorageKey::from_raw(key),
                value,
            });
        }
        Ok(result)
    }

    fn replace(&self, owner: OwnerId, stale: &[StorageKey], entries: &[StorageEntry]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let owner_raw = owner.to_string();
        {
            let mut delete = tx.prepare("DELETE FROM postmeta WHERE owner_id = ?1 AND meta_key = ?2")?;
            for key in stale {
                delete.execute(params![owner_raw, key.as_str()])?;
            }
            let mut upsert = tx.prepare(
                "INSERT OR REPLACE INTO postmeta (owner_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
            )?;
            for entry in entries {
                upsert.execute(params![owner_raw, entry.key.as_str(), entry.value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
