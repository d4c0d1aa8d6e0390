//! Tenant registry and per-tenant connection management for Tenement.
//!
//! This crate provides:
//! - The registry data model (tenants and plans) and its PostgreSQL store
//! - Creation and removal of physical tenant databases
//! - A metadata cache for host lookups, with negative entries
//! - A connection pool holding one live handle per tenant database
//! - [`TenantDirectory`], which ties the above together for request routing

pub mod cache;
pub mod directory;
pub mod error;
pub mod models;
pub mod pool;
pub mod postgres;
pub mod repos;
pub mod store;

pub use cache::{CacheLookup, TenantMetadataCache};
pub use directory::{Resolution, TenantContext, TenantDirectory};
pub use error::{RegistryError, RegistryResult};
pub use pool::{ConnectionHandle, ConnectionPool, PostgresConnector, TenantConnector};
pub use postgres::PostgresStore;
pub use store::RegistryStore;

use tenement_core::config::RegistryConfig;

/// Connect to the registry database described by `config`.
pub async fn from_config(config: &RegistryConfig) -> RegistryResult<PostgresStore> {
    config.validate().map_err(RegistryError::Config)?;

    if let Some(url) = &config.url {
        tracing::info!("Connecting to registry database using connection URL");
        return PostgresStore::from_url(url, config.max_connections, config.statement_timeout_ms)
            .await;
    }

    match (config.host.as_deref(), config.database.as_deref()) {
        (Some(host), Some(database)) => {
            PostgresStore::from_params(
                host,
                config.port.unwrap_or(5432),
                config.username.as_deref(),
                config.password.as_deref(),
                database,
                config.ssl_mode,
                config.max_connections,
                config.statement_timeout_ms,
            )
            .await
        }
        _ => Err(RegistryError::Config(
            "registry config requires either 'url' or 'host' + 'database'".to_string(),
        )),
    }
}
