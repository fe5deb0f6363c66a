//! Backend dispatch
//!
//! Thin fan-out over the configured backends in fixed registration
//! order; the first backend that produces a principal wins. Backends
//! that are unconfigured or unlicensed answer `None` and cost nothing.

use gatehouse_core::{Principal, PrincipalId, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::backends::AuthBackend;

pub struct Dispatcher {
    backends: Vec<Arc<dyn AuthBackend>>,
}

impl Dispatcher {
    pub fn new(backends: Vec<Arc<dyn AuthBackend>>) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &[Arc<dyn AuthBackend>] {
        &self.backends
    }

    #[instrument(skip(self, secret))]
    pub async fn authenticate(&self, identity: &str, secret: &str) -> Result<Option<Principal>> {
        for backend in &self.backends {
            if let Some(principal) = backend.authenticate(identity, secret).await? {
                debug!(
                    backend = backend.name(),
                    principal = %principal.username,
                    "authenticated"
                );
                return Ok(Some(principal));
            }
        }
        Ok(None)
    }

    #[instrument(skip(self))]
    pub async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        for backend in &self.backends {
            if let Some(principal) = backend.get_principal(id).await? {
                return Ok(Some(principal));
            }
        }
        Ok(None)
    }
}
