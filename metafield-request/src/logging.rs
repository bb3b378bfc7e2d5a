//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::error::{RequestError, RequestResult};

/// Installs a compact `fmt` subscriber filtered by `level`, which accepts
/// any `EnvFilter` directive (`debug`, `metafield_storage=trace,info`).
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init(level: &str) -> RequestResult<bool> {
    let filter = EnvFilter::try_new(level).map_err(|e| RequestError::Logging(e.to_string()))?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok();
    Ok(installed)
}
