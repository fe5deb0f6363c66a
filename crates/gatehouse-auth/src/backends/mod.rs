//! Gated authentication backends
//!
//! Every backend follows the same short-circuiting gate order:
//! 1. backend-specific configuration presence (absent: silent refusal),
//! 2. license feature check (disabled: error-logged refusal),
//! 3. the external protocol client (failure: error-logged refusal;
//!    credential rejection: silent refusal).
//!
//! All of those collapse to `Ok(None)`. An `Err` is reserved for entity
//! store failures, which abort the enclosing request unchanged.

pub mod directory;
pub mod radius;
pub mod saml;
pub mod tacacs;

use async_trait::async_trait;
use gatehouse_core::{FeatureGate, MappingTable, MembershipOracle, Principal, PrincipalId, Result};
use std::collections::HashSet;
use tracing::error;

/// License feature required by the directory backend.
pub const FEATURE_LDAP: &str = "ldap";

/// License feature required by the RADIUS, TACACS+ and SAML backends.
pub const FEATURE_ENTERPRISE_AUTH: &str = "enterprise_auth";

/// Uniform gated-authentication contract implemented by every variant.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` uniformly covers: backend not configured, feature not
    /// licensed, external protocol failure, and credential rejection.
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<Option<Principal>>;

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<Principal>>;

    // External group data feeds role-membership sync, never ad-hoc
    // permission checks; the authorization surface of a backend denies
    // everything.

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

/// Boundary callback fired once per successful directory authentication,
/// after the principal has been resolved locally.
#[async_trait]
pub trait PopulatedUserHook: Send + Sync {
    async fn user_populated(
        &self,
        principal: &Principal,
        oracle: &dyn MembershipOracle,
        mapping: &MappingTable,
    ) -> Result<()>;
}

/// Shared license gate. The refusal is logged so an operator can tell a
/// licensing problem apart from a plain failed login.
pub(crate) fn licensed(gate: &dyn FeatureGate, feature: &str, backend: &str, action: &str) -> bool {
    if gate.is_enabled(feature) {
        return true;
    }
    error!(
        backend,
        feature, "unable to {}, license does not support {} authentication", action, backend
    );
    false
}
