//! In-memory field tree.
//!
//! A [`FieldNode`] pairs a schema with its current content: an optional
//! value for scalars, an ordered list of [`GroupNode`]s for complex fields.
//! Nodes are created fresh for each save or load and are never cached.

use std::sync::Arc;

use metafield_types::{FieldName, GroupType};
use serde::{Deserialize, Serialize};

use crate::error::{CommandError, CommandResult};
use crate::schema::{FieldKind, FieldSchema, GroupSchema};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Value(Option<String>),
    Groups(Vec<GroupNode>),
}

/// One field with its value(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    schema: Arc<FieldSchema>,
    content: Content,
}

/// One instance of a complex field's sub-field set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    group_type: Option<GroupType>,
    fields: Vec<FieldNode>,
}

impl FieldNode {
    /// Creates an empty node: no value, no groups.
    pub fn empty(schema: Arc<FieldSchema>) -> Self {
        let content = if schema.is_complex() {
            Content::Groups(Vec::new())
        } else {
            Content::Value(None)
        };
        Self { schema, content }
    }

    /// Creates a scalar node holding `value`.
    pub fn with_value(schema: Arc<FieldSchema>, value: Option<String>) -> Self {
        debug_assert!(!schema.is_complex());
        Self {
            schema,
            content: Content::Value(value),
        }
    }

    /// Creates a complex node holding `groups`.
    pub fn with_groups(schema: Arc<FieldSchema>, groups: Vec<GroupNode>) -> Self {
        debug_assert!(schema.is_complex());
        Self {
            schema,
            content: Content::Groups(groups),
        }
    }

    pub fn schema(&self) -> &Arc<FieldSchema> {
        &self.schema
    }

    /// Prefixed field name (`_field1`).
    pub fn name(&self) -> &FieldName {
        self.schema.name()
    }

    pub fn kind(&self) -> FieldKind {
        self.schema.kind()
    }

    /// Scalar value; always `None` for complex fields.
    pub fn value(&self) -> Option<&str> {
        match &self.content {
            Content::Value(value) => value.as_deref(),
            Content::Groups(_) => None,
        }
    }

    /// Group instances; always empty for scalar fields.
    pub fn values(&self) -> &[GroupNode] {
        match &self.content {
            Content::Groups(groups) => groups,
            Content::Value(_) => &[],
        }
    }

    /// Replaces a scalar value. Ignored on complex fields.
    pub fn set_value(&mut self, value: Option<String>) {
        if let Content::Value(current) = &mut self.content {
            *current = value;
        }
    }

    /// Mutable access to the groups of a complex field.
    pub fn groups_mut(&mut self) -> CommandResult<&mut Vec<GroupNode>> {
        match &mut self.content {
            Content::Groups(groups) => Ok(groups),
            Content::Value(_) => Err(CommandError::NotComplex(self.schema.name().clone())),
        }
    }

    /// Applies a group command dispatched by the rendering layer.
    pub fn apply(&mut self, command: &GroupCommand) -> CommandResult<()> {
        let schema = Arc::clone(&self.schema);
        let name = schema.name().clone();
        let groups = self.groups_mut()?;
        let check = |index: usize, len: usize| {
            if index < len {
                Ok(())
            } else {
                Err(CommandError::IndexOutOfRange {
                    field: name.clone(),
                    index,
                    len,
                })
            }
        };
        match command {
            GroupCommand::Add { group_type } => {
                let group_schema = resolve_group(&schema, group_type.as_deref())?;
                groups.push(GroupNode::empty(group_schema));
            }
            GroupCommand::Clone { index } => {
                check(*index, groups.len())?;
                let copy = groups[*index].clone();
                groups.insert(index + 1, copy);
            }
            GroupCommand::Remove { index } => {
                check(*index, groups.len())?;
                groups.remove(*index);
            }
            GroupCommand::Move { from, to } => {
                check(*from, groups.len())?;
                check(*to, groups.len())?;
                let group = groups.remove(*from);
                groups.insert(*to, group);
            }
        }
        Ok(())
    }

    /// Visits every scalar node in the subtree, depth first, in order.
    pub fn for_each_leaf<'a>(&'a self, visit: &mut dyn FnMut(&'a FieldNode)) {
        match &self.content {
            Content::Value(_) => visit(self),
            Content::Groups(groups) => {
                for group in groups {
                    for field in &group.fields {
                        field.for_each_leaf(visit);
                    }
                }
            }
        }
    }
}

fn resolve_group<'a>(schema: &'a FieldSchema, group_type: Option<&str>) -> CommandResult<&'a GroupSchema> {
    match (schema.kind(), group_type) {
        (FieldKind::Repeater, _) => schema
            .group(None)
            .ok_or_else(|| CommandError::NotComplex(schema.name().clone())),
        (FieldKind::GroupSet, Some(raw)) => GroupType::new(raw)
            .ok()
            .and_then(|group_type| schema.group(Some(&group_type)))
            .ok_or_else(|| CommandError::UnknownGroupType {
                field: schema.name().clone(),
                group_type: raw.to_string(),
            }),
        (FieldKind::GroupSet, None) => Err(CommandError::GroupTypeRequired(schema.name().clone())),
        _ => Err(CommandError::NotComplex(schema.name().clone())),
    }
}

impl GroupNode {
    /// An instance of `schema` with every sub-field present and empty.
    pub fn empty(schema: &GroupSchema) -> Self {
        Self {
            group_type: schema.group_type().cloned(),
            fields: schema
                .fields()
                .iter()
                .map(|field| FieldNode::empty(Arc::clone(field)))
                .collect(),
        }
    }

    /// Creates an instance from its sub-fields.
    ///
    /// An empty scalar inside an instance is stored as `""` and reads back
    /// as no value, so `Some("")` is normalized to `None` here.
    pub fn new(group_type: Option<GroupType>, mut fields: Vec<FieldNode>) -> Self {
        for field in &mut fields {
            if let Content::Value(value) = &mut field.content {
                if value.as_deref() == Some("") {
                    *value = None;
                }
            }
        }
        Self { group_type, fields }
    }

    /// Group type tag (`_group1`), `None` for repeater instances.
    pub fn group_type(&self) -> Option<&GroupType> {
        self.group_type.as_ref()
    }

    /// Sub-fields in schema order.
    pub fn fields(&self) -> &[FieldNode] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [FieldNode] {
        &mut self.fields
    }

    /// Looks up a sub-field by name; accepts `field1` or `_field1`.
    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        let name = FieldName::new(name).ok()?;
        self.fields.iter().find(|f| f.name() == &name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldNode> {
        let name = FieldName::new(name).ok()?;
        self.fields.iter_mut().find(|f| f.name() == &name)
    }
}

/// Group mutations the rendering layer dispatches against a complex field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GroupCommand {
    /// Append an empty instance (of `group_type` for group-sets).
    Add {
        #[serde(default)]
        group_type: Option<String>,
    },
    /// Insert a copy of instance `index` right after it.
    Clone { index: usize },
    /// Remove instance `index`; later instances shift down.
    Remove { index: usize },
    /// Move instance `from` to position `to`.
    Move { from: usize, to: usize },
}
