//! Route configuration.

use crate::auth::{admin_auth_middleware, trace_middleware};
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::tenant::tenant_middleware;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        // Health check (unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/public/tenants", get(handlers::list_tenants))
        .route("/v1/public/tenants/signup", post(handlers::signup))
        .route("/v1/tenant/context", get(handlers::tenant_context));

    let admin_routes = Router::new()
        .route(
            "/v1/admin/tenants",
            get(handlers::list_tenants).post(handlers::create_tenant),
        )
        .route(
            "/v1/admin/tenants/{identifier}",
            delete(handlers::delete_tenant),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    let mut router = Router::new().merge(public_routes).merge(admin_routes);

    // When enabled, restrict this endpoint to the scraper at the network level.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Layers run outermost first: TraceLayer -> trace id -> tenant routing -> handler
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tenant_middleware,
        ))
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
