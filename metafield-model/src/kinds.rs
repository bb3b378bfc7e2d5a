//! Kind-tag registry.
//!
//! Maps string tags (as found in configuration or host code) to a
//! constructor for one of the closed [`FieldKind`]s. Tags can be added as
//! aliases, but every tag resolves to a known kind at registration time.
//!
//! Schema files are read as [`FieldSpec`]s, whose `kind` is a plain tag, and
//! turned into schemas with [`KindRegistry::build`].

use std::collections::BTreeMap;

use metafield_types::FieldName;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{FieldKind, FieldSchema};

/// Builds an empty field of a fixed kind.
pub type FieldConstructor = fn(FieldName) -> FieldSchema;

fn text(name: FieldName) -> FieldSchema {
    FieldSchema::bare(FieldKind::Text, name)
}

fn textarea(name: FieldName) -> FieldSchema {
    FieldSchema::bare(FieldKind::Textarea, name)
}

fn hidden(name: FieldName) -> FieldSchema {
    FieldSchema::bare(FieldKind::Hidden, name)
}

fn repeater(name: FieldName) -> FieldSchema {
    FieldSchema::bare(FieldKind::Repeater, name)
}

fn group_set(name: FieldName) -> FieldSchema {
    FieldSchema::bare(FieldKind::GroupSet, name)
}

fn constructor_for(kind: FieldKind) -> FieldConstructor {
    match kind {
        FieldKind::Text => text,
        FieldKind::Textarea => textarea,
        FieldKind::Hidden => hidden,
        FieldKind::Repeater => repeater,
        FieldKind::GroupSet => group_set,
    }
}

#[derive(Debug, Clone, Copy)]
struct KindEntry {
    kind: FieldKind,
    construct: FieldConstructor,
}

/// A field as declared in a schema file, before its kind tag is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,
}

/// One group of a [`FieldSpec`]; `group_type` is omitted for repeaters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    pub fields: Vec<FieldSpec>,
}

/// Registry of field kind tags.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    entries: BTreeMap<String, KindEntry>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (tag, kind) in [
            ("text", FieldKind::Text),
            ("textarea", FieldKind::Textarea),
            ("hidden", FieldKind::Hidden),
            ("repeater", FieldKind::Repeater),
            ("groups", FieldKind::GroupSet),
            ("group_set", FieldKind::GroupSet),
            ("complex", FieldKind::GroupSet),
        ] {
            registry.entries.insert(
                tag.to_string(),
                KindEntry {
                    kind,
                    construct: constructor_for(kind),
                },
            );
        }
        registry
    }
}

impl KindRegistry {
    /// A registry with no tags at all.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers `tag` as an alias for `kind`.
    pub fn register(&mut self, tag: &str, kind: FieldKind) -> ConfigResult<()> {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(ConfigError::UnknownKind(tag));
        }
        if self.entries.contains_key(&tag) {
            return Err(ConfigError::DuplicateKind(tag));
        }
        self.entries.insert(
            tag,
            KindEntry {
                kind,
                construct: constructor_for(kind),
            },
        );
        Ok(())
    }

    /// Resolves a tag to its kind.
    pub fn kind_of(&self, tag: &str) -> Option<FieldKind> {
        self.entries
            .get(&tag.trim().to_ascii_lowercase())
            .map(|entry| entry.kind)
    }

    /// Creates an empty field from a tag, e.g. `create("text", "field1")`.
    pub fn create(&self, tag: &str, name: &str) -> ConfigResult<FieldSchema> {
        let entry = self
            .entries
            .get(&tag.trim().to_ascii_lowercase())
            .ok_or_else(|| ConfigError::UnknownKind(tag.to_string()))?;
        let name = FieldName::new(name)?;
        Ok((entry.construct)(name))
    }

    /// Builds and validates a schema tree, resolving every `kind` tag here.
    pub fn build(&self, spec: &FieldSpec) -> ConfigResult<FieldSchema> {
        let schema = self.build_unchecked(spec)?;
        schema.validate()?;
        Ok(schema)
    }

    fn build_unchecked(&self, spec: &FieldSpec) -> ConfigResult<FieldSchema> {
        let mut field = self.create(&spec.kind, &spec.name)?;
        if let Some(label) = &spec.label {
            field = field.with_label(label.clone());
        }
        if spec.required {
            field = field.required();
        }
        if field.kind() == FieldKind::Repeater && spec.groups.len() > 1 {
            return Err(ConfigError::InvalidStructure {
                name: field.name().clone(),
                reason: "repeaters have exactly one unnamed group".into(),
            });
        }
        for group in &spec.groups {
            let children = group
                .fields
                .iter()
                .map(|child| self.build_unchecked(child))
                .collect::<ConfigResult<Vec<_>>>()?;
            field = match &group.group_type {
                Some(group_type) => field.add_group(group_type, children)?,
                None => field.add_fields(children)?,
            };
        }
        Ok(field)
    }

    /// All registered tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
