//! Federated SAML authentication backend and attribute adapter

use async_trait::async_trait;
use gatehouse_core::{FeatureGate, Principal, PrincipalId, PrincipalRepository, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::backends::{licensed, AuthBackend, FEATURE_ENTERPRISE_AUTH};
use crate::settings::{IdpAttributeConfig, SamlServiceProviderSettings, SettingsRegistry};

/// Standard SAML attribute OIDs used as mapping defaults.
pub const OID_USERID: &str = "urn:oid:0.9.2342.19200300.100.1.1";
pub const OID_MAIL: &str = "urn:oid:0.9.2342.19200300.100.1.3";
pub const OID_GIVEN_NAME: &str = "urn:oid:2.5.4.42";
pub const OID_SURNAME: &str = "urn:oid:2.5.4.4";

/// Conf keys whose misses an operator has to fix in the provider entry.
const CANONICAL_CONF_KEYS: [&str; 4] = [
    "attr_first_name",
    "attr_last_name",
    "attr_username",
    "attr_email",
];

/// Attribute statement from a validated SAML assertion. Values are scalar
/// or list-valued.
#[derive(Debug, Clone)]
pub struct FederatedAssertion {
    pub attributes: HashMap<String, Value>,
}

/// Opaque client validating a SAML response against one identity
/// provider. `Ok(None)` is an assertion rejection.
#[async_trait]
pub trait FederatedAuthClient: Send + Sync {
    async fn authenticate(
        &self,
        idp: &IdentityAttributeAdapter,
        saml_response: &str,
    ) -> Result<Option<FederatedAssertion>>;
}

/// Maps configurable external attribute keys to canonical identity fields
/// for one identity provider.
#[derive(Debug, Clone)]
pub struct IdentityAttributeAdapter {
    name: String,
    conf: IdpAttributeConfig,
}

impl IdentityAttributeAdapter {
    pub fn new(name: impl Into<String>, conf: IdpAttributeConfig) -> Self {
        Self {
            name: name.into(),
            conf,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve `conf_key` to an external attribute name (provider
    /// override, else `default_attribute`) and return that attribute's
    /// first value. Misses on canonical fields are logged so the operator
    /// knows which provider entry to update.
    pub fn get_attribute(
        &self,
        attributes: &HashMap<String, Value>,
        conf_key: &str,
        default_attribute: &str,
    ) -> Option<String> {
        let key = self.conf.get(conf_key).unwrap_or(default_attribute);
        let value = attributes.get(key).and_then(first_value);
        if value.is_none() && CANONICAL_CONF_KEYS.contains(&conf_key) {
            warn!(
                field = conf_key.trim_start_matches("attr_"),
                attribute = key,
                provider = %self.name,
                "could not map user detail from SAML attribute; update the provider's attribute mapping"
            );
        }
        value
    }

    /// Permanent external id of the assertion's subject. A scalar value
    /// is returned directly; a list contributes its first element.
    pub fn permanent_user_id(&self, attributes: &HashMap<String, Value>) -> Option<String> {
        let key = self.conf.get("attr_user_permanent_id").unwrap_or(OID_USERID);
        attributes.get(key).and_then(first_value)
    }

    /// Resolve every canonical identity field, warning on each one the
    /// provider's attribute statement cannot supply.
    pub fn user_details(&self, attributes: &HashMap<String, Value>) -> FederatedUserDetails {
        FederatedUserDetails {
            username: self.get_attribute(attributes, "attr_username", OID_USERID),
            email: self.get_attribute(attributes, "attr_email", OID_MAIL),
            first_name: self.get_attribute(attributes, "attr_first_name", OID_GIVEN_NAME),
            last_name: self.get_attribute(attributes, "attr_last_name", OID_SURNAME),
        }
    }
}

/// Canonical identity fields mapped out of an assertion.
#[derive(Debug, Clone, Default)]
pub struct FederatedUserDetails {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

fn first_value(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(scalar_to_string),
        other => scalar_to_string(other),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub struct SamlBackend {
    registry: Arc<SettingsRegistry>,
    gate: Arc<dyn FeatureGate>,
    client: Arc<dyn FederatedAuthClient>,
    principals: Arc<dyn PrincipalRepository>,
}

impl SamlBackend {
    pub fn new(
        registry: Arc<SettingsRegistry>,
        gate: Arc<dyn FeatureGate>,
        client: Arc<dyn FederatedAuthClient>,
        principals: Arc<dyn PrincipalRepository>,
    ) -> Self {
        Self {
            registry,
            gate,
            client,
            principals,
        }
    }

    /// Build the attribute adapter for one configured identity provider.
    fn identity_provider(
        &self,
        settings: &SamlServiceProviderSettings,
        name: &str,
    ) -> Option<IdentityAttributeAdapter> {
        settings
            .enabled_idps
            .get(name)
            .map(|conf| IdentityAttributeAdapter::new(name, conf.clone()))
    }
}

#[async_trait]
impl AuthBackend for SamlBackend {
    fn name(&self) -> &'static str {
        "saml"
    }

    /// For this variant `identity` carries the identity-provider name and
    /// `secret` the SAML response payload.
    #[instrument(skip(self, secret))]
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<Option<Principal>> {
        let Some(settings) = SamlServiceProviderSettings::from_registry(&self.registry) else {
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
        let Some(adapter) = self.identity_provider(&settings, identity) else {
            debug!(provider = identity, "identity provider is not configured");
            return Ok(None);
        };

        match self.client.authenticate(&adapter, secret).await {
            Ok(Some(assertion)) => {
                let details = adapter.user_details(&assertion.attributes);
                let username = details
                    .username
                    .or_else(|| adapter.permanent_user_id(&assertion.attributes));
                let Some(username) = username else {
                    warn!(
                        provider = %adapter.name(),
                        "assertion carries no usable subject identifier"
                    );
                    return Ok(None);
                };

                let (mut principal, created) = self.principals.get_or_create(&username).await?;
                if created || principal.password_usable {
                    self.principals.set_unusable_password(principal.id).await?;
                    principal.password_usable = false;
                }
                Ok(Some(principal))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                error!(error = %e, "SAML authentication error");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        if SamlServiceProviderSettings::from_registry(&self.registry).is_none() {
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
