//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid {label}: {value}")]
    InvalidIdentifier { label: &'static str, value: String },

    #[error("invalid tenant name: {0}")]
    InvalidName(String),

    #[error("invalid connection parameters: {0}")]
    InvalidConnection(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
