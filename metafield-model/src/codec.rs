//! Schema-driven storage key encoding and decoding.
//!
//! Field names may themselves contain underscores, so a key can only be
//! split back into its path with the schema at hand: decoding walks the
//! schema, matching group types and child names as prefixes, and accepts the
//! first candidate whose remainder is exactly one index per complex level.

use std::collections::BTreeMap;
use std::sync::Arc;

use metafield_types::{FieldName, GroupType, KeyLevel, KeyPath, StorageKey, parse_indices};
use tracing::warn;

use crate::node::{FieldNode, GroupNode};
use crate::schema::FieldSchema;

/// One scalar value ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub key: StorageKey,
    pub value: String,
}

/// Flattens a tree into its stored entries, in tree order.
///
/// A root scalar without a value produces no entry. Every scalar inside an
/// instance produces one, `""` when empty, so that an instance with no
/// values still exists in storage and keeps its position. The index of a
/// group is its position in the node's group list, counted across all
/// group types.
pub fn storage_entries(node: &FieldNode) -> Vec<StorageEntry> {
    let mut out = Vec::new();
    collect(node, KeyPath::root(node.name().clone()), &mut out);
    out
}

fn collect(node: &FieldNode, path: KeyPath, out: &mut Vec<StorageEntry>) {
    if !node.schema().is_complex() {
        let value = match node.value() {
            Some(value) => value,
            None if !path.levels.is_empty() => "",
            None => return,
        };
        out.push(StorageEntry {
            key: path.encode(),
            value: value.to_string(),
        });
        return;
    }
    for (index, group) in node.values().iter().enumerate() {
        for field in group.fields() {
            let child = path
                .clone()
                .child(group.group_type().cloned(), field.name().clone(), index);
            collect(field, child, out);
        }
    }
}

type Levels = Vec<(Option<GroupType>, FieldName)>;

/// Decodes `key` under one root field's schema.
pub fn decode_key(schema: &FieldSchema, key: &str) -> Option<KeyPath> {
    let rest = key.strip_prefix(schema.name().as_str())?;
    let mut candidates = Vec::new();
    name_candidates(schema, rest, &mut Vec::new(), &mut candidates);

    candidates.into_iter().find_map(|(levels, remaining)| {
        let indices = parse_indices(remaining, levels.len())?;
        let mut path = KeyPath::root(schema.name().clone());
        for ((group_type, field), index) in levels.into_iter().zip(indices) {
            path = path.child(group_type, field, index);
        }
        Some(path)
    })
}

/// Decodes `key` against every root, returning the position of the root it
/// belongs to.
pub fn decode_any(schemas: &[Arc<FieldSchema>], key: &str) -> Option<(usize, KeyPath)> {
    schemas
        .iter()
        .enumerate()
        .find_map(|(pos, schema)| decode_key(schema, key).map(|path| (pos, path)))
}

fn name_candidates<'a>(
    field: &FieldSchema,
    rest: &'a str,
    prefix: &mut Levels,
    out: &mut Vec<(Levels, &'a str)>,
) {
    if !field.is_complex() {
        out.push((prefix.clone(), rest));
        return;
    }
    for group in field.groups() {
        let after_type = match group.group_type() {
            Some(group_type) => match rest.strip_prefix(group_type.as_str()) {
                Some(after) => after,
                None => continue,
            },
            None => rest,
        };
        for child in group.fields() {
            if let Some(after) = after_type.strip_prefix(child.name().as_str()) {
                prefix.push((group.group_type().cloned(), child.name().clone()));
                name_candidates(child, after, prefix, out);
                prefix.pop();
            }
        }
    }
}

/// The fixed part of a leaf's keys and the number of indices after it.
struct KeyTemplate {
    stem: String,
    depth: usize,
    path: String,
}

fn key_templates(schema: &FieldSchema, out: &mut Vec<KeyTemplate>) {
    let root = schema.name().as_str();
    templates_into(schema, root.to_string(), root.to_string(), 0, out);
}

fn templates_into(field: &FieldSchema, stem: String, path: String, depth: usize, out: &mut Vec<KeyTemplate>) {
    if !field.is_complex() {
        out.push(KeyTemplate { stem, depth, path });
        return;
    }
    for group in field.groups() {
        let group_type = group.group_type().map_or("", GroupType::as_str);
        let group_path = match group.group_type() {
            Some(group_type) => format!("{path}/{group_type}"),
            None => path.clone(),
        };
        for child in group.fields() {
            let name = child.name().as_str();
            templates_into(
                child,
                format!("{stem}{group_type}{name}"),
                format!("{group_path}/{name}"),
                depth + 1,
                out,
            );
        }
    }
}

/// True when some choice of indices gives both templates the same key: the
/// longer stem must extend the shorter one by whole `_<n>` segments, which
/// then stand in for the shorter template's extra indices.
fn overlaps(a: &KeyTemplate, b: &KeyTemplate) -> bool {
    let (short, long) = if a.stem.len() <= b.stem.len() { (a, b) } else { (b, a) };
    let Some(tail) = long.stem.strip_prefix(short.stem.as_str()) else {
        return false;
    };
    short
        .depth
        .checked_sub(long.depth)
        .is_some_and(|extra| parse_indices(tail, extra).is_some())
}

/// Finds two leaves among `schemas` that can be stored under the same key,
/// returning their paths (`_root/_group/_child`).
pub fn find_ambiguity<'a>(schemas: impl IntoIterator<Item = &'a FieldSchema>) -> Option<(String, String)> {
    let mut templates = Vec::new();
    for schema in schemas {
        key_templates(schema, &mut templates);
    }
    templates.iter().enumerate().find_map(|(pos, a)| {
        templates[pos + 1..]
            .iter()
            .find(|b| overlaps(a, b))
            .map(|b| (a.path.clone(), b.path.clone()))
    })
}

/// Result of rebuilding one root field from decoded entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub node: FieldNode,
    /// Keys that decoded but could not be placed (e.g. an instance index
    /// claimed by two different group types; the first one wins).
    pub conflicts: Vec<StorageKey>,
}

#[derive(Clone, Copy)]
struct Entry<'a> {
    path: &'a KeyPath,
    depth: usize,
    value: &'a str,
}

impl<'a> Entry<'a> {
    fn remaining(&self) -> &'a [KeyLevel] {
        &self.path.levels[self.depth..]
    }
}

/// Rebuilds a root field from `(path, value)` pairs decoded under `schema`.
///
/// Instances are ordered by index and renumbered contiguously; an instance's
/// group type is the one of the first entry seen for that index; sub-fields
/// follow schema order.
pub fn assemble(schema: &Arc<FieldSchema>, entries: &[(KeyPath, String)]) -> Assembly {
    let entries: Vec<Entry<'_>> = entries
        .iter()
        .map(|(path, value)| Entry {
            path,
            depth: 0,
            value: value.as_str(),
        })
        .collect();
    let mut conflicts = Vec::new();
    let node = build(schema, entries, &mut conflicts);
    Assembly { node, conflicts }
}

fn build(schema: &Arc<FieldSchema>, entries: Vec<Entry<'_>>, conflicts: &mut Vec<StorageKey>) -> FieldNode {
    if !schema.is_complex() {
        let mut value = None;
        for entry in entries {
            if entry.remaining().is_empty() && value.is_none() {
                value = Some(entry.value.to_string());
            } else {
                conflicts.push(entry.path.encode());
            }
        }
        return FieldNode::with_value(Arc::clone(schema), value);
    }

    let mut by_index: BTreeMap<usize, (Option<GroupType>, Vec<Entry<'_>>)> = BTreeMap::new();
    for entry in entries {
        let Some(level) = entry.remaining().first() else {
            conflicts.push(entry.path.encode());
            continue;
        };
        let slot = by_index
            .entry(level.index)
            .or_insert_with(|| (level.group_type.clone(), Vec::new()));
        if slot.0 != level.group_type {
            warn!(
                "Key {} claims instance {} of {} as {:?}, already seen as {:?}",
                entry.path.encode(),
                level.index,
                schema.name(),
                level.group_type,
                slot.0
            );
            conflicts.push(entry.path.encode());
            continue;
        }
        slot.1.push(entry);
    }

    let mut groups = Vec::with_capacity(by_index.len());
    for (group_type, group_entries) in by_index.into_values() {
        let Some(group_schema) = schema.group(group_type.as_ref()) else {
            conflicts.extend(group_entries.iter().map(|e| e.path.encode()));
            continue;
        };
        let fields = group_schema
            .fields()
            .iter()
            .map(|child| {
                let child_entries = group_entries
                    .iter()
                    .filter(|e| &e.remaining()[0].field == child.name())
                    .map(|e| Entry {
                        depth: e.depth + 1,
                        ..*e
                    })
                    .collect();
                build(child, child_entries, conflicts)
            })
            .collect();
        groups.push(GroupNode::new(group_type, fields));
    }
    FieldNode::with_groups(Arc::clone(schema), groups)
}
