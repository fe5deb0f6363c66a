//! Embedded schema migrations
//!
//! Statements are idempotent so the runner can execute on every startup.

use gatehouse_core::{GatehouseError, Result};
use sqlx::PgPool;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS principals (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        external_dn TEXT,
        password_usable BOOLEAN NOT NULL DEFAULT TRUE,
        superuser BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS organizations (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS organization_role_memberships (
        organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        role_kind TEXT NOT NULL,
        principal_id UUID NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
        PRIMARY KEY (organization_id, role_kind, principal_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS teams (
        id UUID PRIMARY KEY,
        organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        UNIQUE (organization_id, name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS team_memberships (
        team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
        principal_id UUID NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
        PRIMARY KEY (team_id, principal_id)
    )
    "#,
];

/// Apply the schema to the connected database.
pub async fn run(pool: &PgPool) -> Result<()> {
    info!("Applying database schema");
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| GatehouseError::database_error(format!("migration failed: {}", e)))?;
    }
    Ok(())
}
