//! Registry error types.

use thiserror::Error;

/// Registry and tenant connection errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] tenement_core::Error),

    #[error("tenant connection failed for {db_name}: {message}")]
    Connection { db_name: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// PostgreSQL SQLSTATE for unique_violation.
pub const UNIQUE_VIOLATION: &str = "23505";

impl RegistryError {
    /// Map unique constraint violations to `AlreadyExists`, keeping every
    /// other database error as is.
    pub fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
        {
            let constraint = db_err.constraint().unwrap_or("unique constraint");
            return RegistryError::AlreadyExists(format!("{what} violates {constraint}"));
        }
        RegistryError::Database(err)
    }
}
