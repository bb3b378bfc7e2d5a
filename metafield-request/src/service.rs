//! Saving and loading one container's fields for a record.

use std::sync::Arc;

use metafield_crypto::NonceService;
use metafield_model::form::{populate_all, populate_flat};
use metafield_model::{Container, FieldNode, RenderSource, Validatable, Violation};
use metafield_storage::{LoadReport, MetaPersister, MetaStore, SaveSummary};
use metafield_types::OwnerId;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::context::{FormShape, RequestContext};
use crate::error::RequestResult;
use crate::validator::SaveValidator;

/// What [`ContainerService::handle_save`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Fields were persisted.
    Saved(SaveSummary),
    /// The request failed the save check; nothing was written.
    Skipped,
    /// Submitted values failed validation; nothing was written.
    Invalid(Vec<Violation>),
}

/// Binds a container to a store and a token service.
pub struct ContainerService<S> {
    container: Container,
    persister: MetaPersister<S>,
    nonces: Arc<dyn NonceService>,
    validator: SaveValidator,
}

impl<S: std::fmt::Debug> std::fmt::Debug for ContainerService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerService")
            .field("container", &self.container)
            .field("persister", &self.persister)
            .finish_non_exhaustive()
    }
}

impl<S: MetaStore> ContainerService<S> {
    pub fn new(container: Container, store: S, nonces: Arc<dyn NonceService>) -> Self {
        let validator = SaveValidator::new(Arc::clone(&nonces));
        Self {
            container,
            persister: MetaPersister::new(store),
            nonces,
            validator,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn persister(&self) -> &MetaPersister<S> {
        &self.persister
    }

    /// A fresh token for this container's save form.
    pub fn create_token(&self) -> String {
        self.nonces.create_token(&self.container.nonce_name())
    }

    /// Whether `request` may save this container.
    pub fn is_valid_save(&self, request: &RequestContext) -> bool {
        let action = self.container.nonce_name();
        self.validator.is_valid_save(request, &action)
    }

    /// Builds this container's trees from the submitted parameters.
    ///
    /// Nested submissions look roots up by name; flat ones decode every text
    /// parameter as a storage key.
    pub fn fields_from(&self, request: &RequestContext) -> Vec<FieldNode> {
        let schemas = self.container.fields();
        match request.shape {
            FormShape::Nested => populate_all(schemas, &request.params),
            FormShape::Flat => {
                let nonce_name = self.container.nonce_name();
                let mut params = request.text_params();
                params.remove(&nonce_name);
                let submission = populate_flat(schemas, &params);
                if !submission.unknown_keys.is_empty() {
                    debug!(
                        "Ignoring {} parameters outside container {}",
                        submission.unknown_keys.len(),
                        self.container.id()
                    );
                }
                for key in &submission.conflicts {
                    warn!("Dropping conflicting parameter {} for container {}", key, self.container.id());
                }
                submission.fields
            }
        }
    }

    /// Persists the submitted fields without any request checks.
    pub fn save(&self, owner: OwnerId, request: &RequestContext) -> RequestResult<SaveSummary> {
        let fields = self.fields_from(request);
        Ok(self.persister.save(owner, &fields)?)
    }

    /// Checks the request, validates the submission, then saves.
    pub fn handle_save(&self, owner: OwnerId, request: &RequestContext) -> RequestResult<SaveOutcome> {
        if !self.is_valid_save(request) {
            info!(
                "Skipping save of container {} for owner {}",
                self.container.id(),
                owner
            );
            return Ok(SaveOutcome::Skipped);
        }
        let fields = self.fields_from(request);
        let violations: Vec<Violation> = fields.iter().flat_map(Validatable::validate).collect();
        if !violations.is_empty() {
            warn!(
                "Refusing save of container {} for owner {}: {} invalid fields",
                self.container.id(),
                owner,
                violations.len()
            );
            return Ok(SaveOutcome::Invalid(violations));
        }
        let summary = self.persister.save(owner, &fields)?;
        Ok(SaveOutcome::Saved(summary))
    }

    /// Loads this container's fields for `owner`.
    pub fn load(&self, owner: OwnerId) -> RequestResult<LoadReport> {
        Ok(self.persister.load(owner, self.container.fields())?)
    }

    /// Loaded fields plus the nonce, as handed to a renderer.
    pub fn render(&self, owner: OwnerId) -> RequestResult<Value> {
        let report = self.load(owner)?;
        let fields: Vec<Value> = report.fields.iter().map(|f| f.render_data()).collect();
        Ok(json!({
            "id": self.container.id(),
            "title": self.container.title(),
            "record_type": self.container.scope().as_str(),
            "nonce": {
                "name": self.container.nonce_name(),
                "value": self.create_token(),
            },
            "fields": fields,
        }))
    }
}
