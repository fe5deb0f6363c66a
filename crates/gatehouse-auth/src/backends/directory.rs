//! Directory bind authentication backend
//!
//! Settings are a hot-reloaded snapshot: a configuration-change
//! notification under the directory prefix invalidates the cached
//! `DirectorySettings`, and the next access rebuilds it in whole and
//! swaps it in atomically. Each backend instance owns its subscription
//! and releases it on drop.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use gatehouse_core::{
    FeatureGate, MembershipOracle, Principal, PrincipalId, PrincipalRepository, Result,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use crate::backends::{licensed, AuthBackend, PopulatedUserHook, FEATURE_LDAP};
use crate::settings::{
    DirectorySettings, SettingsRegistry, SettingsSubscription, DIRECTORY_SETTINGS_PREFIX,
};

/// One successful bind against the external directory.
pub struct DirectorySession {
    /// Username as normalized by the directory.
    pub username: String,
    /// Membership oracle bound to this session.
    pub oracle: Arc<dyn MembershipOracle>,
}

/// Opaque client for the directory bind protocol.
///
/// `Ok(None)` means the directory rejected the credentials; `Err` means
/// the exchange itself failed.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn bind(
        &self,
        settings: &DirectorySettings,
        username: &str,
        password: &str,
    ) -> Result<Option<DirectorySession>>;
}

pub struct DirectoryBackend {
    registry: Arc<SettingsRegistry>,
    gate: Arc<dyn FeatureGate>,
    client: Arc<dyn DirectoryClient>,
    principals: Arc<dyn PrincipalRepository>,
    hooks: Vec<Arc<dyn PopulatedUserHook>>,
    cached: Arc<ArcSwapOption<DirectorySettings>>,
    // Held for its Drop: deregisters the change subscription so the
    // registry never calls back into a disposed instance.
    _subscription: SettingsSubscription,
}

impl DirectoryBackend {
    pub fn new(
        registry: Arc<SettingsRegistry>,
        gate: Arc<dyn FeatureGate>,
        client: Arc<dyn DirectoryClient>,
        principals: Arc<dyn PrincipalRepository>,
    ) -> Self {
        let cached: Arc<ArcSwapOption<DirectorySettings>> = Arc::new(ArcSwapOption::empty());
        let invalidate = Arc::clone(&cached);
        let subscription = registry.subscribe(DIRECTORY_SETTINGS_PREFIX, move |key| {
            debug!(key, "directory settings changed, invalidating snapshot");
            invalidate.store(None);
        });

        Self {
            registry,
            gate,
            client,
            principals,
            hooks: Vec::new(),
            cached,
            _subscription: subscription,
        }
    }

    /// Register a callback fired after each successful authentication.
    pub fn on_user_populated(&mut self, hook: Arc<dyn PopulatedUserHook>) {
        self.hooks.push(hook);
    }

    /// Current settings snapshot. Rebuilt in whole after an invalidation;
    /// readers always observe either the old or the new snapshot.
    pub fn settings(&self) -> Arc<DirectorySettings> {
        if let Some(settings) = self.cached.load_full() {
            return settings;
        }
        let fresh = Arc::new(DirectorySettings::from_registry(&self.registry));
        self.cached.store(Some(Arc::clone(&fresh)));
        fresh
    }

    async fn populate(
        &self,
        session: DirectorySession,
        settings: &DirectorySettings,
    ) -> Result<Principal> {
        let (mut principal, created) = self.principals.get_or_create(&session.username).await?;
        if created || principal.password_usable {
            self.principals.set_unusable_password(principal.id).await?;
            principal.password_usable = false;
        }

        for hook in &self.hooks {
            hook.user_populated(&principal, session.oracle.as_ref(), &settings.mapping)
                .await?;
        }

        // Hooks may have updated the stored record (external dn).
        Ok(self
            .principals
            .get_by_id(principal.id)
            .await?
            .unwrap_or(principal))
    }
}

#[async_trait]
impl AuthBackend for DirectoryBackend {
    fn name(&self) -> &'static str {
        "directory"
    }

    #[instrument(skip(self, secret))]
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<Option<Principal>> {
        let settings = self.settings();
        if !settings.is_configured() {
            return Ok(None);
        }
        if !licensed(self.gate.as_ref(), FEATURE_LDAP, self.name(), "authenticate") {
            return Ok(None);
        }

        match self.client.bind(&settings, identity, secret).await {
            Ok(Some(session)) => {
                let principal = self.populate(session, &settings).await?;
                Ok(Some(principal))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                error!(error = %e, "encountered an error authenticating to the directory");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        if !self.settings().is_configured() {
            return Ok(None);
        }
        if !licensed(
            self.gate.as_ref(),
            FEATURE_LDAP,
            self.name(),
            "look up a principal",
        ) {
            return Ok(None);
        }
        self.principals.get_by_id(id).await
    }

    // Directory group data is mirrored into organization/team roles by
    // the sync engine; it never answers ad-hoc permission checks.

    fn has_permission(&self, _principal: &Principal, _permission: &str) -> bool {
        false
    }

    fn has_module_permissions(&self, _principal: &Principal, _module: &str) -> bool {
        false
    }

    fn get_all_permissions(&self, _principal: &Principal) -> HashSet<String> {
        HashSet::new()
    }

    fn get_group_permissions(&self, _principal: &Principal) -> HashSet<String> {
        HashSet::new()
    }
}
