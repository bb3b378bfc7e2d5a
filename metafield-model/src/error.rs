//! Error types for the field model.

use metafield_types::{FieldName, RecordScope};
use thiserror::Error;

/// Result type for setup-time operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fatal configuration errors, raised while fields and containers are being
/// declared and never while a request is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field or group name failed validation.
    #[error(transparent)]
    InvalidName(#[from] metafield_types::Error),

    /// Two siblings share a name.
    #[error("duplicate field name {name} in {parent}")]
    DuplicateField { name: FieldName, parent: String },

    /// A root field name is already registered under the same record scope.
    #[error("field {name} is already registered for record type {scope} by container {owner}")]
    DuplicateInScope {
        name: FieldName,
        scope: RecordScope,
        owner: String,
    },

    /// No constructor is registered for the given kind tag.
    #[error("unknown field kind: {0}")]
    UnknownKind(String),

    /// A kind tag is registered twice.
    #[error("field kind {0} is already registered")]
    DuplicateKind(String),

    /// A complex field was declared without any sub-fields.
    #[error("complex field {0} has no groups")]
    EmptyComplex(FieldName),

    /// The record scope of a container changed after fields were registered.
    #[error("container {0} already has fields; set it up before adding them")]
    SetupAfterFields(String),

    /// Sub-fields were added to a field kind that cannot hold them, or a
    /// group type was used where none is allowed (or vice versa).
    #[error("invalid structure for {name}: {reason}")]
    InvalidStructure { name: FieldName, reason: String },

    /// Two leaves can encode to the same storage key, e.g. `_g/_a/_b_x` and
    /// `_g/_a_b/_x`.
    #[error("fields {first} and {second} can be stored under the same key")]
    AmbiguousKey { first: String, second: String },
}

/// Result type for group mutation commands.
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors produced when applying a [`GroupCommand`](crate::GroupCommand).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The target field is a scalar.
    #[error("field {0} is not a complex field")]
    NotComplex(FieldName),

    /// No group of the requested type exists in the schema.
    #[error("field {field} has no group type {group_type}")]
    UnknownGroupType { field: FieldName, group_type: String },

    /// The field holds named groups and the command did not name one.
    #[error("field {0} requires a group type")]
    GroupTypeRequired(FieldName),

    /// Instance index out of range.
    #[error("group index {index} out of range for {field} ({len} groups)")]
    IndexOutOfRange {
        field: FieldName,
        index: usize,
        len: usize,
    },
}
