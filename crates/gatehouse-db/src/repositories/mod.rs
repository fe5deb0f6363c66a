//! PostgreSQL repository implementations

mod organization;
mod principal;
mod team;

pub use organization::PgOrganizationRepository;
pub use principal::PgPrincipalRepository;
pub use team::PgTeamRepository;

use gatehouse_core::GatehouseError;

pub(crate) fn db_err(e: sqlx::Error) -> GatehouseError {
    GatehouseError::database_error(e.to_string())
}
