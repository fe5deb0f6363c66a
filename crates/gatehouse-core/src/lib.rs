//! Gatehouse Core - domain types and boundary traits for the
//! authentication gateway
//!
//! This crate defines the vocabulary shared by every identity backend:
//! - Strongly-typed ids and persisted models (`Principal`, `Organization`,
//!   `Team`)
//! - Declarative group-to-role mapping rules (`MembershipRule` and the
//!   mapping tables built from them)
//! - Boundary traits for external collaborators (`FeatureGate`,
//!   `MembershipOracle`) and persistence (`PrincipalRepository`,
//!   `OrganizationRepository`, `TeamRepository`)

pub mod error;
pub mod ids;
pub mod mapping;
pub mod models;
pub mod traits;

#[cfg(test)]
mod tests;

pub use error::*;
pub use ids::*;
pub use mapping::*;
pub use models::*;
pub use traits::*;
