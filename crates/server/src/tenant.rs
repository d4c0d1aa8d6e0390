//! Host-based tenant routing middleware.

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::Response;
use tenement_registry::Resolution;

pub use tenement_registry::TenantContext;

const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// The host a request addresses.
///
/// `X-Forwarded-Host` wins only when `trust_forwarded` is set. HTTP/2
/// requests without a Host header fall back to the URI authority.
pub fn request_host(req: &Request, trust_forwarded: bool) -> Option<String> {
    let headers = req.headers();
    if trust_forwarded && let Some(host) = header_value(headers, X_FORWARDED_HOST) {
        return Some(host);
    }
    header_value(headers, HOST.as_str())
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve the request host and attach a [`TenantContext`] when it names a
/// registered tenant. Unknown and non-tenant hosts pass through untouched.
/// Registry or connection failures fail the request.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(host) = request_host(&req, state.config.server.trust_forwarded_host) else {
        return Ok(next.run(req).await);
    };

    let resolution = state.directory.resolve(&host).await;
    metrics::POOL_HANDLES.set(state.directory.pool().len() as i64);

    match resolution {
        Ok(Resolution::NotTenantHost) => {}
        Ok(Resolution::Unknown { lookup_key, cached }) => {
            metrics::record_lookup(cached);
            metrics::TENANT_RESOLUTIONS
                .with_label_values(&["unknown"])
                .inc();
            tracing::debug!(lookup_key = %lookup_key, "No tenant registered for host");
        }
        Ok(Resolution::Tenant { context, cached }) => {
            metrics::record_lookup(cached);
            metrics::TENANT_RESOLUTIONS
                .with_label_values(&["tenant"])
                .inc();
            tracing::debug!(
                tenant_id = %context.tenant.id,
                db_name = %context.tenant.db_name,
                "Resolved tenant"
            );
            req.extensions_mut().insert(context);
        }
        Err(e) => {
            metrics::TENANT_RESOLUTIONS
                .with_label_values(&["error"])
                .inc();
            tracing::error!(host = %host, error = %e, "Tenant resolution failed");
            return Err(e.into());
        }
    }

    Ok(next.run(req).await)
}
