//! Principal repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use gatehouse_core::{Principal, PrincipalId, PrincipalRepository, Result};

use super::db_err;

/// PostgreSQL implementation of PrincipalRepository
pub struct PgPrincipalRepository {
    pool: PgPool,
}

impl PgPrincipalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_principal(row: &PgRow) -> Result<Principal> {
    Ok(Principal {
        id: PrincipalId::from_uuid(row.try_get::<Uuid, _>("id").map_err(db_err)?),
        username: row.try_get("username").map_err(db_err)?,
        external_dn: row.try_get("external_dn").map_err(db_err)?,
        password_usable: row.try_get("password_usable").map_err(db_err)?,
        superuser: row.try_get("superuser").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

const SELECT_COLUMNS: &str =
    "id, username, external_dn, password_usable, superuser, created_at, updated_at";

#[async_trait]
impl PrincipalRepository for PgPrincipalRepository {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: PrincipalId) -> Result<Option<Principal>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM principals WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(row_to_principal).transpose()
    }

    #[instrument(skip(self))]
    async fn get_by_username(&self, username: &str) -> Result<Option<Principal>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM principals WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(row_to_principal).transpose()
    }

    #[instrument(skip(self))]
    async fn get_or_create(&self, username: &str) -> Result<(Principal, bool)> {
        // Insert-or-fetch: the conflict clause makes concurrent first
        // logins for the same username converge on one row.
        let candidate = Principal::new(username);
        let inserted = sqlx::query(
            "INSERT INTO principals \
             (id, username, external_dn, password_usable, superuser, created_at, updated_at) \
             VALUES ($1, $2, NULL, TRUE, FALSE, $3, $3) \
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(*candidate.id.as_uuid())
        .bind(username)
        .bind(candidate.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        let created = inserted.rows_affected() == 1;

        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM principals WHERE username = $1"
        ))
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok((row_to_principal(&row)?, created))
    }

    #[instrument(skip(self))]
    async fn set_unusable_password(&self, id: PrincipalId) -> Result<()> {
        sqlx::query("UPDATE principals SET password_usable = FALSE, updated_at = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_external_dn(&self, id: PrincipalId, dn: &str) -> Result<()> {
        sqlx::query("UPDATE principals SET external_dn = $2, updated_at = $3 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(dn)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
