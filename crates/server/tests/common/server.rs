//! Server test utilities.

use super::memory::MemoryRegistry;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tenement_core::config::AppConfig;
use tenement_provisioning::bootstrap::AdminAccount;
use tenement_provisioning::{
    MigrationContext, MigrationError, MigrationRunner, ProvisionResult, TenantBootstrapper,
    TenantSession,
};
use tenement_registry::{RegistryResult, TenantConnector};
use tenement_server::{AppState, create_router};

/// Counts runs; fails when `fail` is set.
#[derive(Default)]
pub struct FakeMigrations {
    pub runs: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl MigrationRunner for FakeMigrations {
    async fn run(&self, _context: &MigrationContext) -> Result<(), MigrationError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MigrationError::CommandFailed {
                status: "exit status: 1".to_string(),
                stderr: "password authentication failed for user \"postgres\"".to_string(),
            });
        }
        Ok(())
    }
}

/// Sessions that accept every administrator.
#[derive(Default)]
pub struct AcceptingBootstrapper {
    pub admins: Arc<std::sync::Mutex<Vec<String>>>,
}

struct AcceptingSession {
    admins: Arc<std::sync::Mutex<Vec<String>>>,
}

#[async_trait]
impl TenantSession for AcceptingSession {
    async fn admin_table_exists(&mut self) -> ProvisionResult<bool> {
        Ok(true)
    }

    async fn upsert_admin(&mut self, admin: &AdminAccount) -> ProvisionResult<()> {
        self.admins.lock().unwrap().push(admin.email.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> ProvisionResult<()> {
        Ok(())
    }
}

#[async_trait]
impl TenantBootstrapper for AcceptingBootstrapper {
    async fn open(&self, _database_url: &str) -> ProvisionResult<Box<dyn TenantSession>> {
        Ok(Box::new(AcceptingSession {
            admins: self.admins.clone(),
        }))
    }
}

/// Lazy pools that never reach a server.
pub struct LazyConnector;

#[async_trait]
impl TenantConnector for LazyConnector {
    async fn connect(&self, db_name: &str) -> RegistryResult<PgPool> {
        let opts = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .database(db_name);
        Ok(PgPoolOptions::new().connect_lazy_with(opts))
    }
}

/// A router over in-memory collaborators.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub registry: Arc<MemoryRegistry>,
    pub migrations: Arc<FakeMigrations>,
    pub bootstrapper: Arc<AcceptingBootstrapper>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a test server with custom config modifications.
    pub fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        tenement_server::metrics::register_metrics();

        let mut config = AppConfig::for_testing();
        modifier(&mut config);

        let registry = Arc::new(MemoryRegistry::default());
        let migrations = Arc::new(FakeMigrations::default());
        let bootstrapper = Arc::new(AcceptingBootstrapper::default());

        let state = AppState::new(
            config,
            registry.clone(),
            Arc::new(LazyConnector),
            migrations.clone(),
            bootstrapper.clone(),
        )
        .expect("Failed to build application state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            registry,
            migrations,
            bootstrapper,
        }
    }
}
