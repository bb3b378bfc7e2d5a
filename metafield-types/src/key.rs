//! Flat storage keys.
//!
//! A key is the concatenation of the root field name, then for every complex
//! level the optional group type and the child field name, then one `_<index>`
//! suffix per complex level, outermost first:
//!
//! ```text
//! _field1                      scalar root
//! _repeater_field1_0           repeater, instance 0
//! _group_group2_field3_1       group-set, instance 1 of type _group2
//! _outer_inner_leaf_2_0        nested complex: outer instance 2, inner 0
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FieldName, GroupType};

/// One complex level on the way from a root field to a scalar leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyLevel {
    /// Group type of the instance; `None` for plain repeaters.
    pub group_type: Option<GroupType>,
    /// Child field selected inside the instance.
    pub field: FieldName,
    /// Zero-based position of the instance within its complex field.
    pub index: usize,
}

/// The tree position a storage key encodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    pub root: FieldName,
    pub levels: Vec<KeyLevel>,
}

impl KeyPath {
    /// Path of a scalar root field.
    #[must_use]
    pub fn root(root: FieldName) -> Self {
        Self {
            root,
            levels: Vec::new(),
        }
    }

    /// Extends the path by one complex level.
    #[must_use]
    pub fn child(mut self, group_type: Option<GroupType>, field: FieldName, index: usize) -> Self {
        self.levels.push(KeyLevel {
            group_type,
            field,
            index,
        });
        self
    }

    /// Encodes the path into its storage key.
    #[must_use]
    pub fn encode(&self) -> StorageKey {
        let mut key = String::from(self.root.as_str());
        for level in &self.levels {
            if let Some(group_type) = &level.group_type {
                key.push_str(group_type.as_str());
            }
            key.push_str(level.field.as_str());
        }
        for level in &self.levels {
            key.push('_');
            key.push_str(&level.index.to_string());
        }
        StorageKey(key)
    }

    /// The name of the scalar leaf this path points at.
    #[must_use]
    pub fn leaf(&self) -> &FieldName {
        self.levels.last().map_or(&self.root, |level| &level.field)
    }
}

/// Flat string identity of one stored scalar value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Wraps a raw key read back from storage.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key string, consuming the key.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&KeyPath> for StorageKey {
    fn from(path: &KeyPath) -> Self {
        path.encode()
    }
}

/// Parses exactly `count` trailing `_<index>` segments from `rest`.
///
/// Indices must be canonical decimal (`0`, `7`, `12`; never `07`) so that
/// decoding followed by encoding reproduces the same key.
#[must_use]
pub fn parse_indices(rest: &str, count: usize) -> Option<Vec<usize>> {
    if count == 0 {
        return rest.is_empty().then(Vec::new);
    }
    let body = rest.strip_prefix('_')?;
    let parts: Vec<&str> = body.split('_').collect();
    if parts.len() != count {
        return None;
    }
    parts
        .into_iter()
        .map(|part| {
            let canonical = !part.is_empty()
                && part.chars().all(|c| c.is_ascii_digit())
                && (part == "0" || !part.starts_with('0'));
            if canonical { part.parse().ok() } else { None }
        })
        .collect()
}
