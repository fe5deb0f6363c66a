//! Error types for the Gatehouse platform

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatehouseError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Authentication error: {message}")]
    AuthError { message: String },

    #[error("Directory error: {message}")]
    DirectoryError { message: String },

    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("Sync error: {message}")]
    SyncError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatehouseError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn auth_error(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    pub fn directory_error(message: impl Into<String>) -> Self {
        Self::DirectoryError {
            message: message.into(),
        }
    }

    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::DatabaseError {
            message: message.into(),
        }
    }

    pub fn sync_error(message: impl Into<String>) -> Self {
        Self::SyncError {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatehouseError>;
