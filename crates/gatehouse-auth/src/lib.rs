//! Gatehouse Auth - license-gated identity backends and role sync
//!
//! This crate provides the pluggable authentication backends for:
//! - Directory bind, with group-to-role synchronization
//! - RADIUS
//! - TACACS+
//! - Federated SAML
//!
//! # Architecture
//!
//! Each backend implements the `AuthBackend` contract and composes an
//! injected external protocol client. Gating is identical across
//! variants and short-circuits in a fixed order: configuration presence,
//! then license feature, then the client call. Every failure mode
//! collapses to "not authenticated"; only entity-store failures surface
//! as errors.
//!
//! Directory authentications additionally fire the populated-user hook,
//! which drives the `GroupSyncEngine`.

pub mod backends;
pub mod dispatcher;
pub mod settings;
pub mod sync;

#[cfg(test)]
mod tests;

// Re-export backend implementations
pub use backends::directory::{DirectoryBackend, DirectoryClient, DirectorySession};
pub use backends::radius::{RadiusBackend, RadiusClient};
pub use backends::saml::{
    FederatedAssertion, FederatedAuthClient, FederatedUserDetails, IdentityAttributeAdapter,
    SamlBackend,
};
pub use backends::tacacs::{TacacsClient, TacacsPlusBackend};
pub use backends::{AuthBackend, PopulatedUserHook, FEATURE_ENTERPRISE_AUTH, FEATURE_LDAP};

// Re-export dispatch, settings, and the sync engine
pub use dispatcher::Dispatcher;
pub use settings::{
    DirectorySettings, IdpAttributeConfig, SamlServiceProviderSettings, SettingsRegistry,
    SettingsSubscription, TacacsAuthProtocol, TacacsSettings, DIRECTORY_SETTINGS_PREFIX,
};
pub use sync::{evaluate, GroupSyncEngine};
