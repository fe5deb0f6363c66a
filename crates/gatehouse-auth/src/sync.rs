//! Group-to-role synchronization engine
//!
//! Mirrors a principal's external group memberships into organization and
//! team roles, driven by the declarative mapping tables. One prefetch
//! bounds remote membership queries to a single round trip per sync, and
//! every mutation is an idempotent set update, so re-running against an
//! unchanged snapshot writes nothing.

use async_trait::async_trait;
use gatehouse_core::{
    MappingTable, MembershipOracle, MembershipRule, OrganizationId, OrganizationRepository,
    Principal, PrincipalRepository, Result, RoleKind, TeamId, TeamRepository,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::backends::PopulatedUserHook;

/// Evaluate a rule against the oracle. `Absent` and `Never` are false;
/// `AnyOf` is true when at least one listed group contains the principal.
pub async fn evaluate(rule: &MembershipRule, oracle: &dyn MembershipOracle) -> Result<bool> {
    match rule {
        MembershipRule::Absent | MembershipRule::Never => Ok(false),
        MembershipRule::Always => Ok(true),
        MembershipRule::AnyOf(groups) => {
            for group in groups {
                if oracle.is_member_of(group).await? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

enum RoleTarget {
    Organization(OrganizationId, RoleKind),
    Team(TeamId),
}

/// Computes organization/team role membership from a snapshot of external
/// group memberships.
pub struct GroupSyncEngine<O, T, P>
where
    O: OrganizationRepository,
    T: TeamRepository,
    P: PrincipalRepository,
{
    organizations: Arc<O>,
    teams: Arc<T>,
    principals: Arc<P>,
}

impl<O, T, P> GroupSyncEngine<O, T, P>
where
    O: OrganizationRepository,
    T: TeamRepository,
    P: PrincipalRepository,
{
    pub fn new(organizations: Arc<O>, teams: Arc<T>, principals: Arc<P>) -> Self {
        Self {
            organizations,
            teams,
            principals,
        }
    }

    /// Apply the mapping table to one principal. Organizations are
    /// processed before teams (teams need their organization to exist);
    /// iteration order within each table does not affect the final state,
    /// every update being an independent idempotent set operation.
    #[instrument(skip_all, fields(principal = %principal.username))]
    pub async fn sync(
        &self,
        principal: &Principal,
        oracle: &dyn MembershipOracle,
        mapping: &MappingTable,
    ) -> Result<()> {
        // One remote round trip; every membership check below is answered
        // from this snapshot.
        let groups = oracle.prefetch().await?;
        debug!(
            groups = groups.len(),
            "prefetched external group memberships"
        );

        for (org_name, entry) in &mapping.organizations {
            let org = self.organizations.get_or_create(org_name).await?;
            self.apply(
                principal,
                oracle,
                &entry.admins,
                entry.admins_removal(),
                RoleTarget::Organization(org.id, RoleKind::Admin),
            )
            .await?;
            self.apply(
                principal,
                oracle,
                &entry.users,
                entry.users_removal(),
                RoleTarget::Organization(org.id, RoleKind::Member),
            )
            .await?;
        }

        for (team_name, entry) in &mapping.teams {
            let Some(org_name) = entry.organization.as_deref() else {
                debug!(team = %team_name, "team mapping has no organization, skipping entry");
                continue;
            };
            let org = self.organizations.get_or_create(org_name).await?;
            let team = self.teams.get_or_create(org.id, team_name).await?;
            self.apply(
                principal,
                oracle,
                &entry.users,
                entry.remove,
                RoleTarget::Team(team.id),
            )
            .await?;
        }

        // The stored directory identifier is written only when it changed.
        let session_dn = oracle.distinguished_name();
        if principal.external_dn.as_deref() != Some(session_dn) {
            self.principals
                .set_external_dn(principal.id, session_dn)
                .await?;
        }

        Ok(())
    }

    async fn apply(
        &self,
        principal: &Principal,
        oracle: &dyn MembershipOracle,
        rule: &MembershipRule,
        remove: bool,
        target: RoleTarget,
    ) -> Result<()> {
        // An absent rule leaves the role untouched in both directions.
        if rule.is_absent() {
            return Ok(());
        }
        if evaluate(rule, oracle).await? {
            match target {
                RoleTarget::Organization(id, role) => {
                    self.organizations
                        .add_role_member(id, role, principal.id)
                        .await
                }
                RoleTarget::Team(id) => self.teams.add_member(id, principal.id).await,
            }
        } else if remove {
            match target {
                RoleTarget::Organization(id, role) => {
                    self.organizations
                        .remove_role_member(id, role, principal.id)
                        .await
                }
                RoleTarget::Team(id) => self.teams.remove_member(id, principal.id).await,
            }
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<O, T, P> PopulatedUserHook for GroupSyncEngine<O, T, P>
where
    O: OrganizationRepository,
    T: TeamRepository,
    P: PrincipalRepository,
{
    async fn user_populated(
        &self,
        principal: &Principal,
        oracle: &dyn MembershipOracle,
        mapping: &MappingTable,
    ) -> Result<()> {
        self.sync(principal, oracle, mapping).await
    }
}
