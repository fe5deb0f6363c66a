//! Organization repository implementation

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tracing::instrument;
use uuid::Uuid;

use gatehouse_core::{
    Organization, OrganizationId, OrganizationRepository, PrincipalId, Result, RoleKind,
};

use super::db_err;

/// PostgreSQL implementation of OrganizationRepository
pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    #[instrument(skip(self))]
    async fn get_or_create(&self, name: &str) -> Result<Organization> {
        // Insert-or-fetch rather than check-then-insert: two sessions
        // creating the same organization converge on the winner's row.
        let candidate = Organization {
            id: OrganizationId::new(),
            name: name.to_string(),
            created_at: chrono::Utc::now(),
        };
        sqlx::query(
            "INSERT INTO organizations (id, name, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(*candidate.id.as_uuid())
        .bind(name)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query("SELECT id, name, created_at FROM organizations WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(Organization {
            id: OrganizationId::from_uuid(row.try_get::<Uuid, _>("id").map_err(db_err)?),
            name: row.try_get("name").map_err(db_err)?,
            created_at: row.try_get("created_at").map_err(db_err)?,
        })
    }

    #[instrument(skip(self))]
    async fn add_role_member(
        &self,
        id: OrganizationId,
        role: RoleKind,
        principal: PrincipalId,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO organization_role_memberships (organization_id, role_kind, principal_id) \
             VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(*id.as_uuid())
        .bind(role.to_string())
        .bind(*principal.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_role_member(
        &self,
        id: OrganizationId,
        role: RoleKind,
        principal: PrincipalId,
    ) -> Result<()> {
        sqlx::query(
            "DELETE FROM organization_role_memberships \
             WHERE organization_id = $1 AND role_kind = $2 AND principal_id = $3",
        )
        .bind(*id.as_uuid())
        .bind(role.to_string())
        .bind(*principal.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn role_members(
        &self,
        id: OrganizationId,
        role: RoleKind,
    ) -> Result<HashSet<PrincipalId>> {
        let rows = sqlx::query(
            "SELECT principal_id FROM organization_role_memberships \
             WHERE organization_id = $1 AND role_kind = $2",
        )
        .bind(*id.as_uuid())
        .bind(role.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("principal_id")
                    .map(PrincipalId::from_uuid)
                    .map_err(db_err)
            })
            .collect()
    }
}
