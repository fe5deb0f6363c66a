//! TACACS+ authentication backend

use async_trait::async_trait;
use gatehouse_core::{FeatureGate, Principal, PrincipalId, PrincipalRepository, Result};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use crate::backends::{licensed, AuthBackend, FEATURE_ENTERPRISE_AUTH};
use crate::settings::{SettingsRegistry, TacacsSettings};

/// Opaque TACACS+ protocol client. Connection parameters arrive with each
/// call; `Ok(false)` is a credential rejection.
#[async_trait]
pub trait TacacsClient: Send + Sync {
    async fn authenticate(
        &self,
        settings: &TacacsSettings,
        username: &str,
        password: &str,
    ) -> Result<bool>;
}

pub struct TacacsPlusBackend {
    registry: Arc<SettingsRegistry>,
    gate: Arc<dyn FeatureGate>,
    client: Arc<dyn TacacsClient>,
    principals: Arc<dyn PrincipalRepository>,
}

impl TacacsPlusBackend {
    pub fn new(
        registry: Arc<SettingsRegistry>,
        gate: Arc<dyn FeatureGate>,
        client: Arc<dyn TacacsClient>,
        principals: Arc<dyn PrincipalRepository>,
    ) -> Self {
        Self {
            registry,
            gate,
            client,
            principals,
        }
    }

    async fn get_or_provision(&self, username: &str, secret_presented: bool) -> Result<Principal> {
        // First-time TACACS+ principals are never provisioned privileged.
        let (mut principal, created) = self.principals.get_or_create(username).await?;
        if created {
            debug!(username, "created TACACS+ principal");
        }
        if secret_presented && (created || principal.password_usable) {
            self.principals.set_unusable_password(principal.id).await?;
            principal.password_usable = false;
        }
        Ok(principal)
    }
}

#[async_trait]
impl AuthBackend for TacacsPlusBackend {
    fn name(&self) -> &'static str {
        "tacacs_plus"
    }

    #[instrument(skip(self, secret))]
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<Option<Principal>> {
        // Connection parameters are read from configuration on every
        // attempt, never cached across calls.
        let Some(settings) = TacacsSettings::from_registry(&self.registry) else {
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

        match self.client.authenticate(&settings, identity, secret).await {
            Ok(true) => {
                let principal = self.get_or_provision(identity, !secret.is_empty()).await?;
                Ok(Some(principal))
            }
            Ok(false) => Ok(None),
            Err(e) => {
                error!(error = %e, "TACACS+ authentication error");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        if TacacsSettings::from_registry(&self.registry).is_none() {
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
