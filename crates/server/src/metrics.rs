//! Prometheus metrics for the Tenement server.
//!
//! The `/metrics` endpoint is unauthenticated. Metrics carry no tenant
//! names or hosts, only aggregate counts, but the endpoint should still be
//! network-restricted to the Prometheus scraper.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Routing
pub static TENANT_CACHE_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tenement_tenant_cache_hits_total",
        "Tenant lookups answered from the metadata cache",
    )
    .expect("metric creation failed")
});

pub static TENANT_CACHE_MISSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "tenement_tenant_cache_misses_total",
        "Tenant lookups that went to the registry",
    )
    .expect("metric creation failed")
});

pub static TENANT_RESOLUTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tenement_tenant_resolutions_total",
            "Routing outcomes by result",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static POOL_HANDLES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "tenement_pool_handles",
        "Tenant connection handles currently pooled",
    )
    .expect("metric creation failed")
});

// Provisioning
pub static PROVISIONING_OPERATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tenement_provisioning_operations_total",
            "Tenant create and delete outcomes by operation and result",
        ),
        &["operation", "result"],
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(TENANT_CACHE_HITS.clone()),
            Box::new(TENANT_CACHE_MISSES.clone()),
            Box::new(TENANT_RESOLUTIONS.clone()),
            Box::new(POOL_HANDLES.clone()),
            Box::new(PROVISIONING_OPERATIONS.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!(error = %e, "Failed to register metric");
            }
        }
    });
}

/// Count a lookup as a cache hit or miss.
pub fn record_lookup(cached: bool) {
    if cached {
        TENANT_CACHE_HITS.inc();
    } else {
        TENANT_CACHE_MISSES.inc();
    }
}

/// Count a provisioning outcome; `result` is `ok` or an error kind.
pub fn record_provisioning(operation: &str, result: &str) {
    PROVISIONING_OPERATIONS
        .with_label_values(&[operation, result])
        .inc();
}

/// GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
