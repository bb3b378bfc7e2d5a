//! Submitted form data.
//!
//! A submission arrives either nested (a complex field maps instance
//! positions to maps of sub-field values, group-set instances naming their
//! type under `group`) or flat (storage keys to values). Both are turned into
//! the same [`FieldNode`] trees.

use std::collections::BTreeMap;
use std::sync::Arc;

use metafield_types::{GroupType, KeyPath, StorageKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::{assemble, decode_any};
use crate::node::{FieldNode, GroupNode};
use crate::schema::{FieldKind, FieldSchema};

/// Key under which a group-set instance names its group type.
pub const GROUP_TYPE_KEY: &str = "group";

/// A value in nested form data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Text(String),
    List(Vec<FormValue>),
    Map(BTreeMap<String, FormValue>),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Looks up a member of a map value.
    pub fn get(&self, key: &str) -> Option<&FormValue> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<&str> for FormValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FormValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Builds one root field from nested form data. A missing entry yields an
/// empty node.
pub fn populate(schema: &Arc<FieldSchema>, submitted: Option<&FormValue>) -> FieldNode {
    if !schema.is_complex() {
        let value = match submitted {
            None => None,
            Some(FormValue::Text(text)) => Some(text.clone()),
            Some(_) => {
                warn!("Ignoring non-text value submitted for scalar field {}", schema.name());
                None
            }
        };
        return FieldNode::with_value(Arc::clone(schema), value);
    }

    let instances: Vec<&FormValue> = match submitted {
        None => Vec::new(),
        Some(FormValue::List(items)) => items.iter().collect(),
        Some(FormValue::Map(map)) => ordered_instances(schema, map),
        Some(FormValue::Text(_)) => {
            warn!("Ignoring text value submitted for complex field {}", schema.name());
            Vec::new()
        }
    };

    let mut groups = Vec::with_capacity(instances.len());
    for instance in instances {
        let FormValue::Map(members) = instance else {
            warn!("Skipping malformed instance of {}", schema.name());
            continue;
        };
        let Some(group_schema) = instance_group(schema, members) else {
            continue;
        };
        let fields = group_schema
            .fields()
            .iter()
            .map(|child| {
                let value = members
                    .get(child.name().as_str())
                    .or_else(|| members.get(child.name().base()));
                populate(child, value)
            })
            .collect();
        groups.push(GroupNode::new(group_schema.group_type().cloned(), fields));
    }
    FieldNode::with_groups(Arc::clone(schema), groups)
}

/// Instance maps keyed by position, sorted numerically.
fn ordered_instances<'a>(schema: &FieldSchema, map: &'a BTreeMap<String, FormValue>) -> Vec<&'a FormValue> {
    let mut numbered: Vec<(usize, &FormValue)> = Vec::with_capacity(map.len());
    for (position, value) in map {
        match position.parse::<usize>() {
            Ok(position) => numbered.push((position, value)),
            Err(_) => warn!(
                "Skipping instance of {} with non-numeric position {:?}",
                schema.name(),
                position
            ),
        }
    }
    numbered.sort_by_key(|(position, _)| *position);
    numbered.into_iter().map(|(_, value)| value).collect()
}

fn instance_group<'a>(
    schema: &'a FieldSchema,
    members: &BTreeMap<String, FormValue>,
) -> Option<&'a crate::schema::GroupSchema> {
    if schema.kind() == FieldKind::Repeater {
        return schema.group(None);
    }
    let Some(raw) = members.get(GROUP_TYPE_KEY).and_then(FormValue::as_text) else {
        warn!("Skipping instance of {} without a group type", schema.name());
        return None;
    };
    let group = GroupType::new(raw)
        .ok()
        .and_then(|group_type| schema.group(Some(&group_type)));
    if group.is_none() {
        warn!("Skipping instance of {} with unknown group type {:?}", schema.name(), raw);
    }
    group
}

/// Builds every root field from nested form data keyed by field name
/// (`_field1` or `field1`).
pub fn populate_all(schemas: &[Arc<FieldSchema>], form: &BTreeMap<String, FormValue>) -> Vec<FieldNode> {
    schemas
        .iter()
        .map(|schema| {
            let submitted = form
                .get(schema.name().as_str())
                .or_else(|| form.get(schema.name().base()));
            populate(schema, submitted)
        })
        .collect()
}

/// Trees rebuilt from a flat `key -> value` submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatSubmission {
    pub fields: Vec<FieldNode>,
    /// Keys that matched no declared field.
    pub unknown_keys: Vec<StorageKey>,
    /// Keys that decoded but lost to an earlier key for the same instance.
    pub conflicts: Vec<StorageKey>,
}

/// Builds every root field from a flat submission whose keys follow the
/// storage encoding. Indices are renumbered contiguously.
pub fn populate_flat(schemas: &[Arc<FieldSchema>], form: &BTreeMap<String, String>) -> FlatSubmission {
    let mut per_root: Vec<Vec<(KeyPath, String)>> = vec![Vec::new(); schemas.len()];
    let mut unknown_keys = Vec::new();
    for (key, value) in form {
        match decode_any(schemas, key) {
            Some((root, path)) => per_root[root].push((path, value.clone())),
            None => {
                debug!("Flat submission key {} matches no field", key);
                unknown_keys.push(StorageKey::from_raw(key.as_str()));
            }
        }
    }
    let mut fields = Vec::with_capacity(schemas.len());
    let mut conflicts = Vec::new();
    for (schema, entries) in schemas.iter().zip(per_root) {
        let assembly = assemble(schema, &entries);
        conflicts.extend(assembly.conflicts);
        fields.push(assembly.node);
    }
    FlatSubmission {
        fields,
        unknown_keys,
        conflicts,
    }
}
