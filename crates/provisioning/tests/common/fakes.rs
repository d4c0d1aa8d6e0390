//! Fake collaborators for the provisioning workflow.

use super::memory::MemoryRegistry;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tenement_core::HostResolver;
use tenement_core::config::{PgSslMode, TenantServer};
use tenement_provisioning::bootstrap::AdminAccount;
use tenement_provisioning::{
    AdminPolicy, MigrationContext, MigrationError, MigrationRunner, ProvisionError,
    ProvisionResult, ProvisioningOptions, TenantBootstrapper, TenantService, TenantSession,
};
use tenement_registry::{RegistryResult, TenantConnector, TenantDirectory};

pub const ROOT_DOMAIN: &str = "example.com";

/// Records every migration run.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeMigrations {
    pub runs: Mutex<Vec<MigrationContext>>,
    pub fail: AtomicBool,
    pub delay_ms: AtomicUsize,
}

#[allow(dead_code)]
impl FakeMigrations {
    pub fn calls(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

#[async_trait]
impl MigrationRunner for FakeMigrations {
    async fn run(&self, context: &MigrationContext) -> Result<(), MigrationError> {
        self.runs.lock().unwrap().push(context.clone());
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(MigrationError::CommandFailed {
                status: "exit status: 1".to_string(),
                stderr: "relation \"product\" already exists".to_string(),
            });
        }
        Ok(())
    }
}

/// Tenant sessions backed by shared state.
#[allow(dead_code)]
pub struct FakeBootstrapper {
    pub admin_table: AtomicBool,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub admins: Arc<Mutex<Vec<AdminAccount>>>,
    pub urls: Mutex<Vec<String>>,
}

impl Default for FakeBootstrapper {
    fn default() -> Self {
        Self {
            admin_table: AtomicBool::new(true),
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            admins: Arc::new(Mutex::new(Vec::new())),
            urls: Mutex::new(Vec::new()),
        }
    }
}

struct FakeSession {
    admin_table: bool,
    admins: Arc<Mutex<Vec<AdminAccount>>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl TenantSession for FakeSession {
    async fn admin_table_exists(&mut self) -> ProvisionResult<bool> {
        Ok(self.admin_table)
    }

    async fn upsert_admin(&mut self, admin: &AdminAccount) -> ProvisionResult<()> {
        let mut admins = self.admins.lock().unwrap();
        admins.retain(|a| a.email != admin.email);
        admins.push(admin.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) -> ProvisionResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TenantBootstrapper for FakeBootstrapper {
    async fn open(&self, database_url: &str) -> ProvisionResult<Box<dyn TenantSession>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(database_url.to_string());
        Ok(Box::new(FakeSession {
            admin_table: self.admin_table.load(Ordering::SeqCst),
            admins: self.admins.clone(),
            closed: self.closed.clone(),
        }))
    }
}

/// Hands out lazy pools that never reach a server.
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

pub fn tenant_server() -> TenantServer {
    TenantServer {
        host: "db.internal".to_string(),
        port: Some(5432),
        username: "postgres".to_string(),
        password: "s3cret".to_string(),
        ssl_mode: PgSslMode::Disable,
        max_connections: 2,
    }
}

pub fn options() -> ProvisioningOptions {
    ProvisioningOptions {
        root_domain: ROOT_DOMAIN.to_string(),
        server: tenant_server(),
        admin: AdminPolicy {
            role: "admin".to_string(),
            promote_to_super_admin: true,
            bcrypt_cost: 4,
        },
        migrations_dir: PathBuf::from("/srv/app/migrations"),
        project_dir: Some(PathBuf::from("/srv/app")),
        migration_timeout: None,
    }
}

/// A provisioning service wired to in-memory collaborators.
#[allow(dead_code)]
pub struct Harness {
    pub registry: Arc<MemoryRegistry>,
    pub directory: Arc<TenantDirectory>,
    pub migrations: Arc<FakeMigrations>,
    pub bootstrapper: Arc<FakeBootstrapper>,
    pub service: Arc<TenantService>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_options(options())
    }

    pub fn with_options(options: ProvisioningOptions) -> Self {
        Self::try_with_options(options).unwrap()
    }

    pub fn try_with_options(options: ProvisioningOptions) -> Result<Self, ProvisionError> {
        let registry = Arc::new(MemoryRegistry::new());
        let directory = Arc::new(TenantDirectory::new(
            HostResolver::new(Some(ROOT_DOMAIN), Vec::<String>::new()),
            registry.clone(),
            Arc::new(LazyConnector),
        ));
        let migrations = Arc::new(FakeMigrations::default());
        let bootstrapper = Arc::new(FakeBootstrapper::default());
        let service = TenantService::new(
            registry.clone(),
            directory.clone(),
            migrations.clone(),
            bootstrapper.clone(),
            options,
        )?;

        Ok(Self {
            registry,
            directory,
            migrations,
            bootstrapper,
            service: Arc::new(service),
        })
    }
}
