//! Field and group names.
//!
//! Every stored name carries exactly one leading underscore: `field1` and
//! `_field1` both normalize to `_field1`. Keys are built by concatenating
//! these prefixed names, so the underscore doubles as the key separator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

fn normalize(raw: &str) -> crate::Result<String> {
    let base = raw.strip_prefix('_').unwrap_or(raw);
    if base.is_empty() {
        return Err(Error::InvalidName(raw.to_string(), "name is empty"));
    }
    if base.starts_with('_') {
        return Err(Error::InvalidName(
            raw.to_string(),
            "name has more than one leading underscore",
        ));
    }
    if !base
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidName(
            raw.to_string(),
            "only ASCII letters, digits, '-' and '_' are allowed",
        ));
    }
    // An all-digit name would be indistinguishable from an instance index.
    if base.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidName(raw.to_string(), "name is numeric"));
    }
    Ok(format!("_{base}"))
}

/// Name of a field, stored with its leading underscore.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldName(String);

impl FieldName {
    /// Parses and normalizes a field name.
    pub fn new(raw: &str) -> crate::Result<Self> {
        normalize(raw).map(Self)
    }

    /// The prefixed form used in keys and form data (`_field1`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare form without the leading underscore (`field1`).
    #[must_use]
    pub fn base(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FieldName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<FieldName> for String {
    fn from(name: FieldName) -> Self {
        name.0
    }
}

/// Tag of a named group inside a group-set field, stored with its leading
/// underscore (`_group1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupType(String);

impl GroupType {
    /// Parses and normalizes a group type.
    pub fn new(raw: &str) -> crate::Result<Self> {
        normalize(raw).map(Self)
    }

    /// The prefixed form used in keys (`_group1`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare form without the leading underscore (`group1`).
    #[must_use]
    pub fn base(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for GroupType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<GroupType> for String {
    fn from(group: GroupType) -> Self {
        group.0
    }
}
