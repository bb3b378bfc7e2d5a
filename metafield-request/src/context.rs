//! The request a save is served from.
//!
//! Replaces ambient request globals: everything a save looks at (submitted
//! parameters, the autosave flag) travels in one explicit value.

use std::collections::BTreeMap;

use metafield_model::FormValue;
use serde::{Deserialize, Serialize};

/// How field values are laid out in the submitted parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormShape {
    /// Complex fields submitted as position-keyed maps.
    #[default]
    Nested,
    /// Every value submitted under its storage key.
    Flat,
}

/// Submitted parameters plus request flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub params: BTreeMap<String, FormValue>,
    /// Set for background autosaves, which never persist fields.
    #[serde(default)]
    pub autosave: bool,
    #[serde(default)]
    pub shape: FormShape,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request whose values are keyed by storage key.
    pub fn flat(params: BTreeMap<String, String>) -> Self {
        Self {
            params: params.into_iter().map(|(k, v)| (k, FormValue::Text(v))).collect(),
            autosave: false,
            shape: FormShape::Flat,
        }
    }

    /// Parses a JSON request body (`{"params": {...}, "autosave": false}`).
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<FormValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn as_autosave(mut self) -> Self {
        self.autosave = true;
        self
    }

    pub fn param(&self, name: &str) -> Option<&FormValue> {
        self.params.get(name)
    }

    /// A parameter's value when it is plain text.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(FormValue::as_text)
    }

    /// The plain-text parameters, for flat decoding.
    pub fn text_params(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .filter_map(|(k, v)| v.as_text().map(|text| (k.clone(), text.to_string())))
            .collect()
    }
}
