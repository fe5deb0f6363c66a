//! Boundary traits for external collaborators and persistence

use crate::error::Result;
use crate::ids::{OrganizationId, PrincipalId, TeamId};
use crate::models::{Organization, Principal, RoleKind, Team};
use async_trait::async_trait;
use std::collections::HashSet;

/// Reports whether a licensed capability is enabled.
///
/// License state may change at runtime, so callers consult the gate on
/// every decision instead of caching its answers.
pub trait FeatureGate: Send + Sync {
    fn is_enabled(&self, feature: &str) -> bool;
}

/// Query interface over the external directory's group store, bound to one
/// authenticated session.
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    /// Distinguished name of the session's principal in the directory.
    fn distinguished_name(&self) -> &str;

    /// Fetch the full set of group identifiers the principal belongs to,
    /// in one remote round trip. Implementations cache the result so every
    /// later `is_member_of` call is answered locally.
    async fn prefetch(&self) -> Result<HashSet<String>>;

    async fn is_member_of(&self, group_id: &str) -> Result<bool>;
}

/// Persistence operations for principals.
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    async fn get_by_id(&self, id: PrincipalId) -> Result<Option<Principal>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<Principal>>;

    /// Atomic insert-or-fetch by username. Returns the principal and
    /// whether this call created it.
    async fn get_or_create(&self, username: &str) -> Result<(Principal, bool)>;

    /// Mark the locally stored password as unusable; the external identity
    /// source stays the authentication authority.
    async fn set_unusable_password(&self, id: PrincipalId) -> Result<()>;

    async fn set_external_dn(&self, id: PrincipalId, dn: &str) -> Result<()>;
}

/// Persistence operations for organizations and their role collections.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Atomic insert-or-fetch by unique name; safe under concurrent
    /// first-time creation of the same name.
    async fn get_or_create(&self, name: &str) -> Result<Organization>;

    /// Idempotent: adding an existing member is a no-op.
    async fn add_role_member(
        &self,
        id: OrganizationId,
        role: RoleKind,
        principal: PrincipalId,
    ) -> Result<()>;

    /// Idempotent: removing an absent member is a no-op.
    async fn remove_role_member(
        &self,
        id: OrganizationId,
        role: RoleKind,
        principal: PrincipalId,
    ) -> Result<()>;

    async fn role_members(
        &self,
        id: OrganizationId,
        role: RoleKind,
    ) -> Result<HashSet<PrincipalId>>;
}

/// Persistence operations for teams and their member role collection.
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Atomic insert-or-fetch by (organization, name).
    async fn get_or_create(&self, organization_id: OrganizationId, name: &str) -> Result<Team>;

    async fn add_member(&self, id: TeamId, principal: PrincipalId) -> Result<()>;

    async fn remove_member(&self, id: TeamId, principal: PrincipalId) -> Result<()>;

    async fn members(&self, id: TeamId) -> Result<HashSet<PrincipalId>>;
}
