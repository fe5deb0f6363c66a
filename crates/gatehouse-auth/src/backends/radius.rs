//! RADIUS authentication backend

use async_trait::async_trait;
use gatehouse_core::{FeatureGate, Principal, PrincipalId, PrincipalRepository, Result};
use std::sync::Arc;
use tracing::{error, instrument};

use crate::backends::{licensed, AuthBackend, FEATURE_ENTERPRISE_AUTH};
use crate::settings::SettingsRegistry;

/// Settings key naming the RADIUS server address.
pub const RADIUS_SERVER_KEY: &str = "radius.server";

/// Opaque RADIUS protocol client. `Ok(false)` is a credential rejection.
#[async_trait]
pub trait RadiusClient: Send + Sync {
    async fn authenticate(&self, server: &str, username: &str, password: &str) -> Result<bool>;
}

pub struct RadiusBackend {
    registry: Arc<SettingsRegistry>,
    gate: Arc<dyn FeatureGate>,
    client: Arc<dyn RadiusClient>,
    principals: Arc<dyn PrincipalRepository>,
}

impl RadiusBackend {
    pub fn new(
        registry: Arc<SettingsRegistry>,
        gate: Arc<dyn FeatureGate>,
        client: Arc<dyn RadiusClient>,
        principals: Arc<dyn PrincipalRepository>,
    ) -> Self {
        Self {
            registry,
            gate,
            client,
            principals,
        }
    }

    /// Resolve the local principal for an externally authenticated
    /// username. The unusable-password mark is applied only when a secret
    /// was actually presented.
    async fn resolve_principal(&self, username: &str, secret_presented: bool) -> Result<Principal> {
        let (mut principal, created) = self.principals.get_or_create(username).await?;
        if secret_presented && (created || principal.password_usable) {
            self.principals.set_unusable_password(principal.id).await?;
            principal.password_usable = false;
        }
        Ok(principal)
    }
}

#[async_trait]
impl AuthBackend for RadiusBackend {
    fn name(&self) -> &'static str {
        "radius"
    }

    #[instrument(skip(self, secret))]
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<Option<Principal>> {
        let Some(server) = self.registry.get_string(RADIUS_SERVER_KEY) else {
            return Ok(None);
        };
        if !licensed(
            self.gate.as_ref(),
            FEATURE_ENTERPRISE_AUTH,
            self.name(),
            "authenticate",
        ) {
            return Ok(None);
        }

        match self.client.authenticate(&server, identity, secret).await {
            Ok(true) => {
                let principal = self.resolve_principal(identity, !secret.is_empty()).await?;
                Ok(Some(principal))
            }
            Ok(false) => Ok(None),
            Err(e) => {
                error!(error = %e, "RADIUS authentication error");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        if self.registry.get_string(RADIUS_SERVER_KEY).is_none() {
            return Ok(None);
        }
        if !licensed(
            self.gate.as_ref(),
            FEATURE_ENTERPRISE_AUTH,
            self.name(),
            "look up a principal",
        ) {
            return Ok(None);
        }
        self.principals.get_by_id(id).await
    }
}
