use std::sync::Arc;

use metafield_crypto::{NonceService, TokenAge};
use tracing::debug;

use crate::context::RequestContext;

/// Decides whether a request may persist a container's fields.
#[derive(Clone)]
pub struct SaveValidator {
    nonces: Arc<dyn NonceService>,
}

impl std::fmt::Debug for SaveValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveValidator").finish_non_exhaustive()
    }
}

impl SaveValidator {
    pub fn new(nonces: Arc<dyn NonceService>) -> Self {
        Self { nonces }
    }

    /// True iff `request` is not an autosave and carries, under the
    /// parameter named `expected_action`, a token that verifies for that
    /// action. Never consumes the token.
    pub fn is_valid_save(&self, request: &RequestContext, expected_action: &str) -> bool {
        if request.autosave {
            debug!("Autosave request, not saving {}", expected_action);
            return false;
        }
        let Some(token) = request.text(expected_action) else {
            debug!("Request carries no token for {}", expected_action);
            return false;
        };
        match self.nonces.verify_token(token, expected_action) {
            Some(TokenAge::Fresh) => true,
            Some(TokenAge::Aging) => {
                debug!("Accepting token for {} from the previous tick", expected_action);
                true
            }
            None => {
                debug!("Token for {} failed verification", expected_action);
                false
            }
        }
    }
}
