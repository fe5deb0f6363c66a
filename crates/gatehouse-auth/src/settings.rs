//! Notification-driven settings registry and backend settings snapshots
//!
//! The registry holds the raw, dotted-path configuration values every
//! backend reads from. Backends that cache a composed snapshot (the
//! directory backend) subscribe for change notifications scoped to their
//! settings prefix and invalidate the snapshot when a matching key
//! changes; the next access rebuilds it in whole.

use gatehouse_core::{GatehouseError, MappingTable, Result};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Settings prefix owned by the directory backend; any change under it
/// invalidates the backend's cached snapshot.
pub const DIRECTORY_SETTINGS_PREFIX: &str = "directory.";

const DEFAULT_DIRECTORY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TACACS_PORT: u16 = 49;
const DEFAULT_TACACS_SESSION_TIMEOUT_SECS: u64 = 5;

type ChangeCallback = Box<dyn Fn(&str) + Send + Sync>;

struct Subscriber {
    prefix: String,
    on_change: ChangeCallback,
}

/// In-process registry of dotted-path settings keys.
pub struct SettingsRegistry {
    values: RwLock<HashMap<String, Value>>,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_subscription: AtomicU64,
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Build a registry from a composed `config` source (files plus
    /// environment), flattening one section level into dotted keys.
    pub fn from_config(cfg: config::Config) -> Result<Self> {
        let root: Value = cfg
            .try_deserialize()
            .map_err(|e| GatehouseError::config_error(format!("invalid configuration: {e}")))?;

        let registry = Self::new();
        if let Value::Object(sections) = root {
            let mut values = registry.values.write();
            for (section, body) in sections {
                match body {
                    Value::Object(entries) => {
                        for (key, value) in entries {
                            values.insert(format!("{section}.{key}"), value);
                        }
                    }
                    other => {
                        values.insert(section, other);
                    }
                }
            }
        }
        Ok(registry)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Non-empty string value for `key`; empty strings count as
    /// unconfigured.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Typed read; malformed values are reported and treated as absent so
    /// one bad entry cannot take the whole backend down.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(key, error = %e, "ignoring malformed settings value");
                None
            }
        }
    }

    /// Store a value and notify subscribers whose prefix covers the key.
    pub fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
        self.notify(key);
    }

    pub fn remove(&self, key: &str) {
        self.values.write().remove(key);
        self.notify(key);
    }

    fn notify(&self, key: &str) {
        // Callbacks run under the subscriber lock and must not reenter
        // the registry; they only flip cache state.
        let subscribers = self.subscribers.lock();
        for subscriber in subscribers.values() {
            if key.starts_with(&subscriber.prefix) {
                (subscriber.on_change)(key);
            }
        }
    }

    /// Register for change notifications on keys under `prefix`. The
    /// registration is released when the returned guard drops.
    pub fn subscribe(
        self: &Arc<Self>,
        prefix: impl Into<String>,
        on_change: impl Fn(&str) + Send + Sync + 'static,
    ) -> SettingsSubscription {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(
            id,
            Subscriber {
                prefix: prefix.into(),
                on_change: Box::new(on_change),
            },
        );
        SettingsSubscription {
            id,
            registry: Arc::clone(self),
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped change-notification registration. Dropping the guard
/// deregisters the callback, so a disposed backend can never be called
/// back.
pub struct SettingsSubscription {
    id: u64,
    registry: Arc<SettingsRegistry>,
}

impl Drop for SettingsSubscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.id);
    }
}

// =============================================================================
// Directory backend settings
// =============================================================================

/// Immutable directory backend configuration snapshot.
#[derive(Debug, Clone)]
pub struct DirectorySettings {
    pub server_uri: Option<String>,
    /// Network timeout for directory operations; never zero.
    pub connect_timeout_secs: u64,
    /// Group-to-role mapping tables scoped under the directory prefix.
    pub mapping: MappingTable,
}

impl DirectorySettings {
    /// Compose a snapshot from the registry. A missing or zero network
    /// timeout falls back to 30 seconds here, at construction time, so no
    /// call path ever sees an unbounded directory operation.
    pub fn from_registry(registry: &SettingsRegistry) -> Self {
        let connect_timeout_secs = registry
            .get_as::<u64>("directory.connect_timeout_secs")
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_DIRECTORY_TIMEOUT_SECS);

        let organizations = registry
            .get_as("directory.organization_map")
            .unwrap_or_default();
        let teams = registry.get_as("directory.team_map").unwrap_or_default();

        Self {
            server_uri: registry.get_string("directory.server_uri"),
            connect_timeout_secs,
            mapping: MappingTable {
                organizations,
                teams,
            },
        }
    }

    pub fn is_configured(&self) -> bool {
        self.server_uri.is_some()
    }
}

// =============================================================================
// TACACS+ backend settings
// =============================================================================

/// Authentication protocol selector for the TACACS+ exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacacsAuthProtocol {
    #[default]
    Ascii,
    Pap,
    Chap,
}

/// TACACS+ connection parameters, read from the registry on every
/// authentication attempt rather than cached.
#[derive(Debug, Clone)]
pub struct TacacsSettings {
    pub host: String,
    pub port: u16,
    pub secret: String,
    pub session_timeout_secs: u64,
    pub auth_protocol: TacacsAuthProtocol,
}

impl TacacsSettings {
    /// Returns `None` when no host is configured.
    pub fn from_registry(registry: &SettingsRegistry) -> Option<Self> {
        let host = registry.get_string("tacacs_plus.host")?;
        Some(Self {
            host,
            port: registry
                .get_as("tacacs_plus.port")
                .unwrap_or(DEFAULT_TACACS_PORT),
            secret: registry
                .get_string("tacacs_plus.secret")
                .unwrap_or_default(),
            session_timeout_secs: registry
                .get_as("tacacs_plus.session_timeout_secs")
                .unwrap_or(DEFAULT_TACACS_SESSION_TIMEOUT_SECS),
            auth_protocol: registry
                .get_as("tacacs_plus.auth_protocol")
                .unwrap_or_default(),
        })
    }
}

// =============================================================================
// SAML backend settings
// =============================================================================

/// Attribute-name overrides for one identity provider. Keys are the
/// canonical conf keys (`attr_username`, `attr_email`, ...); values name
/// the external SAML attribute to read instead of the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdpAttributeConfig(pub HashMap<String, String>);

impl IdpAttributeConfig {
    pub fn get(&self, conf_key: &str) -> Option<&str> {
        self.0.get(conf_key).map(String::as_str)
    }
}

/// Service-provider side SAML configuration.
#[derive(Debug, Clone)]
pub struct SamlServiceProviderSettings {
    pub sp_entity_id: String,
    pub sp_public_cert: String,
    pub sp_private_key: String,
    pub org_info: Value,
    pub technical_contact: Value,
    pub support_contact: Value,
    pub enabled_idps: HashMap<String, IdpAttributeConfig>,
}

impl SamlServiceProviderSettings {
    /// The SAML backend is configured only when every service-provider
    /// field and at least one enabled identity provider are present.
    pub fn from_registry(registry: &SettingsRegistry) -> Option<Self> {
        let sp_entity_id = registry.get_string("saml.sp_entity_id")?;
        let sp_public_cert = registry.get_string("saml.sp_public_cert")?;
        let sp_private_key = registry.get_string("saml.sp_private_key")?;
        let org_info = registry.get("saml.org_info").filter(|v| !v.is_null())?;
        let technical_contact = registry
            .get("saml.technical_contact")
            .filter(|v| !v.is_null())?;
        let support_contact = registry
            .get("saml.support_contact")
            .filter(|v| !v.is_null())?;
        let enabled_idps: HashMap<String, IdpAttributeConfig> =
            registry.get_as("saml.enabled_idps")?;
        if enabled_idps.is_empty() {
            return None;
        }

        Some(Self {
            sp_entity_id,
            sp_public_cert,
            sp_private_key,
            org_info,
            technical_contact,
            support_contact,
            enabled_idps,
        })
    }
}
