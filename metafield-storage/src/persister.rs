//! Saving field trees to a [`MetaStore`] and loading them back.
//!
//! Each root field owns every stored key that decodes under its schema.
//! Saving a root first removes those keys and then writes the tree's current
//! entries, so instances dropped since the last save leave nothing behind.
//! Keys of a sibling root that merely share a textual prefix
//! (`_list` / `_listing`) never decode under the other root and are left
//! alone.

use std::collections::BTreeSet;
use std::sync::Arc;

use metafield_model::codec::{assemble, decode_any, decode_key};
use metafield_model::{FieldNode, FieldSchema, Storable};
use metafield_types::{KeyPath, OwnerId, StorageKey};
use tracing::{debug, info, warn};

use crate::error::StorageResult;
use crate::store::MetaStore;

/// Row counts of one save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Rows written.
    pub written: usize,
    /// Rows deleted and not rewritten.
    pub removed: usize,
}

/// Trees rebuilt by [`MetaPersister::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// One node per requested root, in request order.
    pub fields: Vec<FieldNode>,
    /// Rows under a root's prefix that decode under no root.
    pub unknown_keys: Vec<StorageKey>,
    /// Rows that decoded but could not be placed in a tree.
    pub conflicts: Vec<StorageKey>,
}

impl LoadReport {
    /// Looks up a loaded root by name (`field1` or `_field1`).
    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        let name = metafield_types::FieldName::new(name).ok()?;
        self.fields.iter().find(|f| f.name() == &name)
    }
}

/// Moves field trees in and out of a store.
#[derive(Debug)]
pub struct MetaPersister<S> {
    store: S,
}

impl<S: MetaStore> MetaPersister<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persists every root in `fields` for `owner`.
    pub fn save(&self, owner: OwnerId, fields: &[FieldNode]) -> StorageResult<SaveSummary> {
        let mut summary = SaveSummary::default();
        for node in fields {
            let root = self.save_root(owner, node)?;
            summary.written += root.written;
            summary.removed += root.removed;
        }
        info!(
            "Saved {} fields for owner {}: {} rows written, {} removed",
            fields.len(),
            owner,
            summary.written,
            summary.removed
        );
        Ok(summary)
    }

    fn save_root(&self, owner: OwnerId, node: &FieldNode) -> StorageResult<SaveSummary> {
        let schema = node.schema();
        let entries = node.storage_entries();
        let fresh: BTreeSet<&StorageKey> = entries.iter().map(|e| &e.key).collect();

        let stale: Vec<StorageKey> = self
            .store
            .scan_prefix(owner, schema.name().as_str())?
            .into_iter()
            .filter(|row| decode_key(schema, row.key.as_str()).is_some())
            .map(|row| row.key)
            .collect();
        let removed = stale.iter().filter(|key| !fresh.contains(key)).count();

        debug!(
            "Replacing {} rows of {} for owner {} with {}",
            stale.len(),
            schema.name(),
            owner,
            entries.len()
        );
        self.store.replace(owner, &stale, &entries)?;
        Ok(SaveSummary {
            written: entries.len(),
            removed,
        })
    }

    /// Rebuilds every root in `schemas` for `owner`. Roots with nothing
    /// stored come back empty.
    pub fn load(&self, owner: OwnerId, schemas: &[Arc<FieldSchema>]) -> StorageResult<LoadReport> {
        let mut fields = Vec::with_capacity(schemas.len());
        let mut unknown = BTreeSet::new();
        let mut conflicts = Vec::new();

        for schema in schemas {
            if !schema.is_complex() {
                let key = KeyPath::root(schema.name().clone()).encode();
                let value = self.store.get(owner, &key)?;
                fields.push(FieldNode::with_value(Arc::clone(schema), value));
                continue;
            }

            let mut entries: Vec<(KeyPath, String)> = Vec::new();
            for row in self.store.scan_prefix(owner, schema.name().as_str())? {
                if let Some(path) = decode_key(schema, row.key.as_str()) {
                    entries.push((path, row.value));
                } else if decode_any(schemas, row.key.as_str()).is_none() {
                    unknown.insert(row.key);
                }
            }
            let assembly = assemble(schema, &entries);
            conflicts.extend(assembly.conflicts);
            fields.push(assembly.node);
        }

        for key in &unknown {
            warn!("Skipping stored key {} for owner {}: matches no declared field", key, owner);
        }
        for key in &conflicts {
            warn!("Skipping stored key {} for owner {}: conflicts with another entry", key, owner);
        }
        Ok(LoadReport {
            fields,
            unknown_keys: unknown.into_iter().collect(),
            conflicts,
        })
    }
}
