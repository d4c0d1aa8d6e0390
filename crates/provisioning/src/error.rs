//! Provisioning error taxonomy.

use crate::migrations::MigrationError;
use tenement_registry::RegistryError;
use thiserror::Error;

/// Errors surfaced by provisioning, plan validation and signup.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{0}")]
    InvalidData(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnexpectedState(String),

    /// Migration or database operation failure.
    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Internal(String),
}

/// Result type for provisioning operations.
pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Stable taxonomy code.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidData(_) => "INVALID_DATA",
            Self::Duplicate(_) => "DUPLICATE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::UnexpectedState(_) => "UNEXPECTED_STATE",
            Self::Database(_) => "DB_ERROR",
            Self::Internal(_) => "UNKNOWN",
        }
    }
}

impl From<RegistryError> for ProvisionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(msg) => Self::NotFound(msg),
            RegistryError::AlreadyExists(msg) => Self::Duplicate(msg),
            RegistryError::InvalidIdentifier(e) => Self::InvalidData(e.to_string()),
            RegistryError::Config(msg) => Self::InvalidData(msg),
            e @ (RegistryError::Database(_) | RegistryError::Connection { .. }) => {
                Self::Database(e.to_string())
            }
            RegistryError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<tenement_core::Error> for ProvisionError {
    fn from(err: tenement_core::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

impl From<MigrationError> for ProvisionError {
    fn from(err: MigrationError) -> Self {
        Self::Database(err.to_string())
    }
}
