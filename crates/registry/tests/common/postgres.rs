//! PostgreSQL testcontainer utilities.

use std::sync::Arc;
use tenement_core::config::{PgSslMode, TenantServer};
use tenement_registry::{PostgresStore, RegistryError, RegistryResult, RegistryStore};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Stable prefix for Docker/container startup failures in Postgres test setup.
/// Tests use this marker to decide whether to skip due to unavailable Docker.
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

/// A migrated registry backed by a throwaway PostgreSQL container.
#[allow(dead_code)]
pub struct PostgresTestRegistry {
    pub store: Arc<PostgresStore>,
    pub server: TenantServer,
    _container: ContainerAsync<Postgres>,
}

impl PostgresTestRegistry {
    pub async fn new() -> RegistryResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                RegistryError::Internal(format!(
                    "{} Failed to start PostgreSQL container: {e}",
                    POSTGRES_CONTAINER_START_ERR_PREFIX
                ))
            })?;

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        // Default credentials from testcontainers-modules postgres
        let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
        let store = PostgresStore::from_url(&url, 5, None).await?;
        store.migrate().await?;

        Ok(Self {
            store: Arc::new(store),
            server: TenantServer {
                host: host.to_string(),
                port: Some(port),
                username: "postgres".to_string(),
                password: "postgres".to_string(),
                ssl_mode: PgSslMode::Disable,
                max_connections: 2,
            },
            _container: container,
        })
    }
}

/// Try to start a PostgreSQL registry, skipping if Docker is unavailable
/// or SKIP_POSTGRES_TESTS is set.
///
/// Only container-start failures cause a skip; schema or connection errors
/// still panic.
pub async fn postgres_or_skip() -> Option<PostgresTestRegistry> {
    if std::env::var("SKIP_POSTGRES_TESTS").is_ok() {
        return None;
    }
    match PostgresTestRegistry::new().await {
        Ok(registry) => Some(registry),
        Err(err) => {
            let msg = err.to_string();
            if msg.contains(POSTGRES_CONTAINER_START_ERR_PREFIX) {
                eprintln!("Skipping PostgreSQL test (Docker unavailable): {msg}");
                None
            } else {
                panic!("PostgreSQL test setup failed: {msg}");
            }
        }
    }
}
