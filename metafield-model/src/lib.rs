//! Field-tree model for Metafield.
//!
//! Defines the types every other Metafield crate works with:
//! - [`FieldSchema`] / [`FieldKind`] : declared fields, scalar or complex
//! - [`KindRegistry`] / [`FieldSpec`] : schema files resolved through string
//!   kind tags mapped onto the closed kind set
//! - [`FieldNode`] / [`GroupNode`] : the per-request value tree
//! - [`Container`] / [`ContainerRegistry`] : root fields bound to a record
//!   type, with per-type name uniqueness
//! - [`codec`] : schema-driven storage key encoding and decoding
//! - [`form`] : nested and flat submissions turned into trees
//! - [`Storable`], [`RenderSource`], [`Validatable`] : capabilities the
//!   persistence, rendering and request layers consume

mod capability;
pub mod codec;
mod container;
mod error;
pub mod form;
mod kinds;
mod node;
mod schema;

pub use capability::{RenderSource, Storable, Validatable, Violation};
pub use codec::{Assembly, StorageEntry};
pub use container::{Container, ContainerRegistry, ContainerSettings};
pub use error::{CommandError, CommandResult, ConfigError, ConfigResult};
pub use form::FormValue;
pub use kinds::{FieldConstructor, FieldSpec, GroupSpec, KindRegistry};
pub use node::{FieldNode, GroupCommand, GroupNode};
pub use schema::{FieldKind, FieldSchema, GroupSchema};
