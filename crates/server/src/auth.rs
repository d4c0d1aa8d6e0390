//! Request tracing and admin authentication middleware.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::Instrument;
use uuid::Uuid;

/// Longer client-provided trace IDs are truncated.
const MAX_TRACE_ID_LEN: usize = 128;

const TRACE_ID_HEADER: &str = "x-trace-id";

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Sanitize a client-provided value: at most [`MAX_TRACE_ID_LEN`]
    /// characters, printable ASCII only.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract the bearer token from the Authorization header.
/// The scheme is case-insensitive (RFC 6750).
fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(v[7..].trim())
            } else {
                None
            }
        })
        .filter(|token| !token.is_empty())
}

/// SHA-256 hex digest of a token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Whether `token` hashes to `expected_hash` (hex, case-insensitive).
/// The digests are compared in constant time.
pub fn token_matches(token: &str, expected_hash: &str) -> bool {
    let expected = expected_hash.trim().to_ascii_lowercase();
    hash_token(token)
        .as_bytes()
        .ct_eq(expected.as_bytes())
        .into()
}

/// Attach a trace ID (from `X-Trace-Id` or freshly generated) and run the
/// request inside a span carrying it.
pub async fn trace_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_default();
    let span = tracing::info_span!("request", trace_id = %trace_id);
    let header = HeaderValue::from_str(trace_id.as_str()).ok();
    req.extensions_mut().insert(trace_id);

    let mut response = next.run(req).instrument(span).await;
    if let Some(value) = header {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

/// Reject requests without the configured admin bearer token.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer_token(&req) else {
        return Err(ApiError::Unauthorized(
            "authentication required".to_string(),
        ));
    };

    if !token_matches(token, &state.config.admin.token_hash) {
        tracing::warn!("Rejected admin request with invalid token");
        return Err(ApiError::Unauthorized("invalid admin token".to_string()));
    }

    Ok(next.run(req).await)
}
