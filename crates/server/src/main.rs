//! Tenement server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tenement_core::config::AppConfig;
use tenement_provisioning::{PgBootstrapper, runner_from_config};
use tenement_registry::{PostgresConnector, RegistryStore};
use tenement_server::{AppState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tenement - multi-tenant database routing and provisioning
#[derive(Parser, Debug)]
#[command(name = "tenementd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "TENEMENT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file overlaid with `TENEMENT_`
/// environment variables (`TENEMENT_REGISTRY__HOST=...`).
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let has_env_config = std::env::vars()
        .any(|(key, _)| key.starts_with("TENEMENT_") && key != "TENEMENT_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: tenementd --config /path/to/config.toml\n  \
             2. Environment variables: TENEMENT_REGISTRY__URL=postgres://... \
             TENEMENT_ADMIN__TOKEN_HASH=YOUR_TOKEN_HASH tenementd\n\n\
             Set TENEMENT_CONFIG to change the default config file path."
        );
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("TENEMENT_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Tenement v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    tenement_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let store = Arc::new(
        tenement_registry::from_config(&config.registry)
            .await
            .context("failed to connect to the tenant registry")?,
    );
    store
        .health_check()
        .await
        .context("registry health check failed")?;
    store
        .migrate()
        .await
        .context("failed to apply registry schema")?;
    tracing::info!("Tenant registry ready");

    let tenant_server = config
        .tenant_database
        .resolve(&config.registry)
        .map_err(anyhow::Error::msg)
        .context("invalid tenant database configuration")?;
    let connector = Arc::new(PostgresConnector::new(tenant_server));
    let migrations = runner_from_config(&config.provisioning.migrations);

    let state = AppState::new(
        config.clone(),
        store,
        connector,
        migrations,
        Arc::new(PgBootstrapper),
    )
    .context("failed to initialize provisioning")?;
    let directory = state.directory.clone();

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    directory.shutdown().await;
    tracing::info!("Tenant connections released");

    Ok(())
}
