//! Request layer for Metafield.
//!
//! Wires the model, token and storage crates into what a host calls per
//! request:
//! - [`RequestContext`] carries submitted parameters explicitly
//! - [`SaveValidator`] decides whether a request may save
//! - [`ContainerService`] saves, loads and renders one container
//! - [`MetafieldConfig`] and [`logging::init`] set the process up

pub mod config;
mod context;
mod error;
pub mod logging;
mod service;
mod validator;

pub use config::MetafieldConfig;
pub use context::{FormShape, RequestContext};
pub use error::{RequestError, RequestResult};
pub use service::{ContainerService, SaveOutcome};
pub use validator::SaveValidator;
