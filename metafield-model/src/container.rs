//! Containers and the per-scope name registry.
//!
//! A container is a titled set of root fields attached to one record type.
//! Root names must be unique per record type across every container that
//! shares a [`ContainerRegistry`]; the registry replaces the process-global
//! bookkeeping a host would otherwise keep.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use metafield_types::{FieldName, RecordScope};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec;
use crate::error::{ConfigError, ConfigResult};
use crate::node::FieldNode;
use crate::schema::FieldSchema;

/// Arguments to [`Container::setup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Record type the container attaches to; defaults to `post`.
    #[serde(default, alias = "post_type")]
    pub record_type: RecordScope,
}

impl ContainerSettings {
    pub fn for_record_type(record_type: &str) -> ConfigResult<Self> {
        Ok(Self {
            record_type: RecordScope::new(record_type)?,
        })
    }
}

#[derive(Debug)]
struct Claim {
    owner: String,
    schema: Arc<FieldSchema>,
}

/// Tracks which container owns each root field, per record type.
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    names: HashMap<RecordScope, BTreeMap<FieldName, Claim>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The container id owning `name` under `scope`, if any.
    pub fn owner_of(&self, scope: &RecordScope, name: &FieldName) -> Option<&str> {
        self.names.get(scope)?.get(name).map(|claim| claim.owner.as_str())
    }

    fn schemas<'a>(&'a self, scope: &RecordScope) -> impl Iterator<Item = &'a Arc<FieldSchema>> + 'a {
        self.names
            .get(scope)
            .into_iter()
            .flat_map(|names| names.values().map(|claim| &claim.schema))
    }

    /// Number of names registered under `scope`.
    pub fn len(&self, scope: &RecordScope) -> usize {
        self.names.get(scope).map_or(0, BTreeMap::len)
    }

    fn check(&self, scope: &RecordScope, name: &FieldName) -> ConfigResult<()> {
        match self.owner_of(scope, name) {
            Some(owner) => Err(ConfigError::DuplicateInScope {
                name: name.clone(),
                scope: scope.clone(),
                owner: owner.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn claim(&mut self, scope: &RecordScope, schema: &Arc<FieldSchema>, container: &str) {
        self.names.entry(scope.clone()).or_default().insert(
            schema.name().clone(),
            Claim {
                owner: container.to_string(),
                schema: Arc::clone(schema),
            },
        );
    }

    fn release(&mut self, scope: &RecordScope, name: &FieldName, container: &str) {
        if let Some(names) = self.names.get_mut(scope) {
            if names.get(name).is_some_and(|claim| claim.owner == container) {
                names.remove(name);
            }
        }
    }
}

/// A titled set of root fields bound to one record type.
#[derive(Debug, Clone)]
pub struct Container {
    id: String,
    title: String,
    scope: RecordScope,
    fields: Vec<Arc<FieldSchema>>,
}

impl Container {
    /// Creates a container attached to the default record type.
    pub fn new(title: &str) -> Self {
        Self {
            id: slugify(title),
            title: title.to_string(),
            scope: RecordScope::default(),
            fields: Vec::new(),
        }
    }

    /// Binds the container to a record type. Must happen before
    /// [`add_fields`](Self::add_fields).
    pub fn setup(&mut self, settings: ContainerSettings) -> ConfigResult<()> {
        if !self.fields.is_empty() {
            return Err(ConfigError::SetupAfterFields(self.id.clone()));
        }
        self.scope = settings.record_type;
        Ok(())
    }

    /// Validates and registers root fields. Nothing is registered if any
    /// field fails: a duplicate inside the batch, inside this container, or
    /// under the same record type in `registry`, or a leaf whose keys can
    /// coincide with another root's under that record type.
    pub fn add_fields(&mut self, registry: &mut ContainerRegistry, fields: Vec<FieldSchema>) -> ConfigResult<()> {
        let mut batch: Vec<&FieldName> = Vec::with_capacity(fields.len());
        for field in &fields {
            field.validate()?;
            let name = field.name();
            if batch.contains(&name) || self.fields.iter().any(|f| f.name() == name) {
                return Err(ConfigError::DuplicateField {
                    name: name.clone(),
                    parent: self.id.clone(),
                });
            }
            registry.check(&self.scope, name)?;
            batch.push(name);
        }

        let mut roots: BTreeMap<&FieldName, &FieldSchema> = registry
            .schemas(&self.scope)
            .chain(&self.fields)
            .map(|schema| (schema.name(), &**schema))
            .collect();
        roots.extend(fields.iter().map(|field| (field.name(), field)));
        if let Some((first, second)) = codec::find_ambiguity(roots.into_values()) {
            return Err(ConfigError::AmbiguousKey { first, second });
        }

        for field in fields {
            let field = Arc::new(field);
            registry.claim(&self.scope, &field, &self.id);
            debug!("Registered field {} for {} in container {}", field.name(), self.scope, self.id);
            self.fields.push(field);
        }
        Ok(())
    }

    /// Releases this container's names so another container may reuse them.
    pub fn detach(&self, registry: &mut ContainerRegistry) {
        for field in &self.fields {
            registry.release(&self.scope, field.name(), &self.id);
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scope(&self) -> &RecordScope {
        &self.scope
    }

    pub fn fields(&self) -> &[Arc<FieldSchema>] {
        &self.fields
    }

    /// Looks up a root field by name (`field1` or `_field1`).
    pub fn field(&self, name: &str) -> Option<&Arc<FieldSchema>> {
        let name = FieldName::new(name).ok()?;
        self.fields.iter().find(|f| f.name() == &name)
    }

    /// Name of the request parameter carrying this container's save token,
    /// also used as the token action.
    pub fn nonce_name(&self) -> String {
        format!("metafield_container_{}_nonce", self.id)
    }

    /// Empty nodes for every root field.
    pub fn empty_tree(&self) -> Vec<FieldNode> {
        self.fields
            .iter()
            .map(|field| FieldNode::empty(Arc::clone(field)))
            .collect()
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}
