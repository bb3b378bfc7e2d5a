use std::collections::HashSet;
use std::sync::Arc;

use metafield_types::{FieldName, GroupType};
use serde::Serialize;

use crate::codec;
use crate::error::{ConfigError, ConfigResult};

/// The closed set of field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Multi-line text.
    Textarea,
    /// Value carried by the form but never shown.
    Hidden,
    /// Repeatable collection of one unnamed group of sub-fields.
    Repeater,
    /// Repeatable collection partitioned into named groups.
    GroupSet,
}

impl FieldKind {
    /// Returns true for kinds whose value is a list of groups.
    #[must_use]
    pub fn is_complex(self) -> bool {
        matches!(self, Self::Repeater | Self::GroupSet)
    }

    /// Canonical tag, as used in schema files and render output.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Hidden => "hidden",
            Self::Repeater => "repeater",
            Self::GroupSet => "group_set",
        }
    }
}

/// Declaration of one field: a scalar, or a complex field with its groups.
///
/// Builders validate as they go; the full tree is checked with
/// [`FieldSchema::validate`] when added to a container. Schema files are
/// read as [`FieldSpec`](crate::FieldSpec)s and built through a
/// [`KindRegistry`](crate::KindRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    name: FieldName,
    kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    groups: Vec<GroupSchema>,
}

/// The sub-fields of one group of a complex field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSchema {
    /// `None` for the single group of a repeater.
    #[serde(skip_serializing_if = "Option::is_none")]
    group_type: Option<GroupType>,
    fields: Vec<Arc<FieldSchema>>,
}

impl GroupSchema {
    pub fn group_type(&self) -> Option<&GroupType> {
        self.group_type.as_ref()
    }

    pub fn fields(&self) -> &[Arc<FieldSchema>] {
        &self.fields
    }

    /// Looks up a sub-field by its prefixed name.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldSchema>> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }
}

impl FieldSchema {
    pub(crate) fn bare(kind: FieldKind, name: FieldName) -> Self {
        Self {
            name,
            kind,
            label: None,
            required: false,
            groups: Vec::new(),
        }
    }

    /// Creates a field of the given kind with no sub-fields.
    pub fn new(kind: FieldKind, name: &str) -> ConfigResult<Self> {
        Ok(Self::bare(kind, FieldName::new(name)?))
    }

    /// Shorthand for a single-line text field.
    pub fn text(name: &str) -> ConfigResult<Self> {
        Self::new(FieldKind::Text, name)
    }

    /// Shorthand for a multi-line text field.
    pub fn textarea(name: &str) -> ConfigResult<Self> {
        Self::new(FieldKind::Textarea, name)
    }

    /// Shorthand for a hidden field.
    pub fn hidden(name: &str) -> ConfigResult<Self> {
        Self::new(FieldKind::Hidden, name)
    }

    /// Shorthand for an empty repeater; add its sub-fields with
    /// [`add_fields`](Self::add_fields).
    pub fn repeater(name: &str) -> ConfigResult<Self> {
        Self::new(FieldKind::Repeater, name)
    }

    /// Shorthand for an empty group-set; add its groups with
    /// [`add_group`](Self::add_group).
    pub fn group_set(name: &str) -> ConfigResult<Self> {
        Self::new(FieldKind::GroupSet, name)
    }

    /// Sets the human-readable label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Appends sub-fields to a repeater.
    pub fn add_fields(mut self, fields: Vec<FieldSchema>) -> ConfigResult<Self> {
        if self.kind != FieldKind::Repeater {
            return Err(ConfigError::InvalidStructure {
                name: self.name,
                reason: "only repeaters take ungrouped sub-fields; use add_group".into(),
            });
        }
        if self.groups.is_empty() {
            self.groups.push(GroupSchema {
                group_type: None,
                fields: Vec::new(),
            });
        }
        let parent = self.name.to_string();
        let group = &mut self.groups[0];
        push_unique(&mut group.fields, fields, &parent)?;
        Ok(self)
    }

    /// Appends a named group of sub-fields to a group-set.
    pub fn add_group(mut self, group_type: &str, fields: Vec<FieldSchema>) -> ConfigResult<Self> {
        if self.kind != FieldKind::GroupSet {
            return Err(ConfigError::InvalidStructure {
                name: self.name,
                reason: "only group-sets take named groups".into(),
            });
        }
        let group_type = GroupType::new(group_type)?;
        if self.groups.iter().any(|g| g.group_type.as_ref() == Some(&group_type)) {
            return Err(ConfigError::InvalidStructure {
                name: self.name,
                reason: format!("group {group_type} declared twice"),
            });
        }
        let parent = format!("{}{}", self.name, group_type);
        let mut group = GroupSchema {
            group_type: Some(group_type),
            fields: Vec::new(),
        };
        push_unique(&mut group.fields, fields, &parent)?;
        self.groups.push(group);
        Ok(self)
    }

    pub fn name(&self) -> &FieldName {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_complex(&self) -> bool {
        self.kind.is_complex()
    }

    pub fn groups(&self) -> &[GroupSchema] {
        &self.groups
    }

    /// Finds the group for a given type (`None` selects a repeater's group).
    pub fn group(&self, group_type: Option<&GroupType>) -> Option<&GroupSchema> {
        self.groups.iter().find(|g| g.group_type.as_ref() == group_type)
    }

    /// Checks the structural rules recursively: scalars have no groups,
    /// repeaters exactly one unnamed group, group-sets one or more uniquely
    /// named groups, every group declares a scalar of its own, and sibling
    /// names never repeat. Then checks that no two leaves can be stored
    /// under the same key.
    pub fn validate(&self) -> ConfigResult<()> {
        self.check_structure()?;
        match codec::find_ambiguity([self]) {
            Some((first, second)) => Err(ConfigError::AmbiguousKey { first, second }),
            None => Ok(()),
        }
    }

    fn check_structure(&self) -> ConfigResult<()> {
        let structure = |reason: &str| ConfigError::InvalidStructure {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        match self.kind {
            FieldKind::Text | FieldKind::Textarea | FieldKind::Hidden => {
                if !self.groups.is_empty() {
                    return Err(structure("scalar fields cannot have sub-fields"));
                }
            }
            FieldKind::Repeater => {
                if self.groups.len() > 1 || self.groups.iter().any(|g| g.group_type.is_some()) {
                    return Err(structure("repeaters have exactly one unnamed group"));
                }
            }
            FieldKind::GroupSet => {
                let mut seen = HashSet::new();
                for group in &self.groups {
                    let Some(group_type) = &group.group_type else {
                        return Err(structure("group-set groups must be named"));
                    };
                    if !seen.insert(group_type) {
                        return Err(structure(&format!("group {group_type} declared twice")));
                    }
                }
            }
        }
        if self.is_complex() && self.groups.iter().all(|g| g.fields.is_empty()) {
            return Err(ConfigError::EmptyComplex(self.name.clone()));
        }
        // An instance exists in storage only through its own scalars.
        for group in &self.groups {
            if group.fields.iter().all(|f| f.is_complex()) {
                let group_name = group.group_type.as_ref().map_or("", GroupType::as_str);
                return Err(structure(&format!("group {group_name} needs at least one scalar sub-field")));
            }
        }
        for group in &self.groups {
            let mut names = HashSet::new();
            for field in &group.fields {
                if !names.insert(field.name()) {
                    return Err(ConfigError::DuplicateField {
                        name: field.name().clone(),
                        parent: self.name.to_string(),
                    });
                }
                field.check_structure()?;
            }
        }
        Ok(())
    }
}

fn push_unique(
    target: &mut Vec<Arc<FieldSchema>>,
    fields: Vec<FieldSchema>,
    parent: &str,
) -> ConfigResult<()> {
    for field in fields {
        if target.iter().any(|f| f.name == field.name) {
            return Err(ConfigError::DuplicateField {
                name: field.name,
                parent: parent.to_string(),
            });
        }
        target.push(Arc::new(field));
    }
    Ok(())
}
