//! PostgreSQL database layer for Gatehouse

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, DatabaseConfig};
pub use repositories::*;
