//! Domain models for the Gatehouse authentication gateway

use crate::ids::{OrganizationId, PrincipalId, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated identity record.
///
/// Principals backed by an external identity source (directory, RADIUS,
/// TACACS+, SAML) carry an unusable local password: the external source is
/// always the authentication authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    /// Distinguished name in the external directory. Present only for
    /// directory-authenticated principals; written only when it changes.
    pub external_dn: Option<String>,
    /// Whether the locally stored password may be used to authenticate.
    pub password_usable: bool,
    pub superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PrincipalId::new(),
            username: username.into(),
            external_dn: None,
            password_usable: true,
            superuser: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Grouping entity with `admins` and `members` role collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    /// Unique across the deployment.
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Team under exactly one organization, with a `members` role collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Named role collection within an organization or team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Admin,
    Member,
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Member => write!(f, "member"),
        }
    }
}
