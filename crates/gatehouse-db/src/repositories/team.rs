//! Team repository implementation

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tracing::instrument;
use uuid::Uuid;

use gatehouse_core::{OrganizationId, PrincipalId, Result, Team, TeamId, TeamRepository};

use super::db_err;

/// PostgreSQL implementation of TeamRepository
pub struct PgTeamRepository {
    pool: PgPool,
}

impl PgTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamRepository for PgTeamRepository {
    #[instrument(skip(self))]
    async fn get_or_create(&self, organization_id: OrganizationId, name: &str) -> Result<Team> {
        let candidate = Team {
            id: TeamId::new(),
            organization_id,
            name: name.to_string(),
            created_at: chrono::Utc::now(),
        };
        sqlx::query(
            "INSERT INTO teams (id, organization_id, name, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (organization_id, name) DO NOTHING",
        )
        .bind(*candidate.id.as_uuid())
        .bind(*organization_id.as_uuid())
        .bind(name)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let row = sqlx::query(
            "SELECT id, organization_id, name, created_at FROM teams \
             WHERE organization_id = $1 AND name = $2",
        )
        .bind(*organization_id.as_uuid())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Team {
            id: TeamId::from_uuid(row.try_get::<Uuid, _>("id").map_err(db_err)?),
            organization_id: OrganizationId::from_uuid(
                row.try_get::<Uuid, _>("organization_id").map_err(db_err)?,
            ),
            name: row.try_get("name").map_err(db_err)?,
            created_at: row.try_get("created_at").map_err(db_err)?,
        })
    }

    #[instrument(skip(self))]
    async fn add_member(&self, id: TeamId, principal: PrincipalId) -> Result<()> {
        sqlx::query(
            "INSERT INTO team_memberships (team_id, principal_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(*id.as_uuid())
        .bind(*principal.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_member(&self, id: TeamId, principal: PrincipalId) -> Result<()> {
        sqlx::query("DELETE FROM team_memberships WHERE team_id = $1 AND principal_id = $2")
            .bind(*id.as_uuid())
            .bind(*principal.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn members(&self, id: TeamId) -> Result<HashSet<PrincipalId>> {
        let rows = sqlx::query("SELECT principal_id FROM team_memberships WHERE team_id = $1")
            .bind(*id.as_uuid())
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
