//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tenement_provisioning::ProvisionError;
use tenement_registry::RegistryError;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "INVALID_DATA",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "UNKNOWN",
            Self::Provision(e) => e.kind(),
            Self::Registry(e) => registry_kind(e),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Provision(_) | Self::Registry(_) => kind_status(self.code()),
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Raw database errors stay in the logs.
            Self::Registry(RegistryError::Database(_)) => "registry unavailable".to_string(),
            Self::Registry(RegistryError::Connection { .. }) => {
                "tenant database unavailable".to_string()
            }
            Self::Provision(ProvisionError::Database(_)) => {
                "tenant database operation failed".to_string()
            }
            Self::Provision(ProvisionError::Internal(_)) => "internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

fn registry_kind(err: &RegistryError) -> &'static str {
    match err {
        RegistryError::NotFound(_) => "NOT_FOUND",
        RegistryError::AlreadyExists(_) => "DUPLICATE_ERROR",
        RegistryError::InvalidIdentifier(_) | RegistryError::Config(_) => "INVALID_DATA",
        RegistryError::Database(_) | RegistryError::Connection { .. } => "DB_ERROR",
        RegistryError::Internal(_) => "UNKNOWN",
    }
}

fn kind_status(kind: &str) -> StatusCode {
    match kind {
        "INVALID_DATA" => StatusCode::BAD_REQUEST,
        "DUPLICATE_ERROR" => StatusCode::CONFLICT,
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
