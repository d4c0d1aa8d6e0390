//! Tenant create, delete and list.

use crate::bootstrap::{AdminPolicy, TenantBootstrapper, bootstrap_admin};
use crate::error::{ProvisionError, ProvisionResult};
use crate::migrations::{MigrationContext, MigrationRunner};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tenement_core::TenantNames;
use tenement_core::config::{AppConfig, TenantServer};
use tenement_registry::models::{NewTenant, TenantRow};
use tenement_registry::{RegistryStore, TenantDirectory};
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Settings for [`TenantService`].
#[derive(Debug, Clone)]
pub struct ProvisioningOptions {
    /// Root domain appended to derived subdomains.
    pub root_domain: String,
    /// Server hosting tenant databases.
    pub server: TenantServer,
    pub admin: AdminPolicy,
    pub migrations_dir: PathBuf,
    pub project_dir: Option<PathBuf>,
    pub migration_timeout: Option<Duration>,
}

impl ProvisioningOptions {
    pub fn from_config(config: &AppConfig) -> ProvisionResult<Self> {
        let server = config
            .tenant_database
            .resolve(&config.registry)
            .map_err(ProvisionError::InvalidData)?;
        let provisioning = &config.provisioning;
        Ok(Self {
            root_domain: config.routing.provisioning_root_domain(),
            server,
            admin: AdminPolicy {
                role: provisioning.admin_role.clone(),
                promote_to_super_admin: provisioning.promote_to_super_admin,
                bcrypt_cost: provisioning.bcrypt_cost,
            },
            migrations_dir: provisioning.migrations.directory().clone(),
            project_dir: provisioning.migrations.project_dir().cloned(),
            migration_timeout: provisioning.migration_timeout(),
        })
    }
}

/// Input for [`TenantService::create`].
#[derive(Clone, Default)]
pub struct CreateTenantInput {
    pub name: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Fully-qualified host; defaults to `<slug>.<root domain>`.
    pub subdomain: Option<String>,
    pub db_name: Option<String>,
    pub plan_id: Option<String>,
}

impl std::fmt::Debug for CreateTenantInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateTenantInput")
            .field("name", &self.name)
            .field("admin_email", &self.admin_email)
            .field("subdomain", &self.subdomain)
            .field("db_name", &self.db_name)
            .field("plan_id", &self.plan_id)
            .finish_non_exhaustive()
    }
}

/// Which tenant to delete.
#[derive(Debug, Clone, Default)]
pub struct DeleteTenantInput {
    pub id: Option<Uuid>,
    pub name: Option<String>,
}

/// Identity of a deleted tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedTenant {
    pub id: Uuid,
    pub name: String,
}

/// Provisions and removes tenants.
///
/// `create` is a sequence of commit points across two databases: nothing is
/// rolled back when a later step fails. Re-running a failed create is safe
/// up to the registry insert, because an existing physical database is
/// reused and the administrator upsert is idempotent.
pub struct TenantService {
    store: Arc<dyn RegistryStore>,
    directory: Arc<TenantDirectory>,
    migrations: Arc<dyn MigrationRunner>,
    bootstrapper: Arc<dyn TenantBootstrapper>,
    options: ProvisioningOptions,
    registry_ready: OnceCell<()>,
    in_flight: Mutex<HashSet<String>>,
}

/// Keys held by an in-progress create; released on drop.
struct InFlight<'a> {
    keys: Vec<String>,
    set: &'a Mutex<HashSet<String>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        for key in &self.keys {
            set.remove(key);
        }
    }
}

impl TenantService {
    pub fn new(
        store: Arc<dyn RegistryStore>,
        directory: Arc<TenantDirectory>,
        migrations: Arc<dyn MigrationRunner>,
        bootstrapper: Arc<dyn TenantBootstrapper>,
        options: ProvisioningOptions,
    ) -> ProvisionResult<Self> {
        if options.server.username.trim().is_empty() || options.server.password.is_empty() {
            return Err(ProvisionError::InvalidData(
                "Database user and password must be configured for tenant provisioning"
                    .to_string(),
            ));
        }

        Ok(Self {
            store,
            directory,
            migrations,
            bootstrapper,
            options,
            registry_ready: OnceCell::new(),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    pub fn options(&self) -> &ProvisioningOptions {
        &self.options
    }

    /// Provision a tenant: database, migrations, administrator, registry row.
    pub async fn create(&self, input: CreateTenantInput) -> ProvisionResult<TenantRow> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ProvisionError::InvalidData(
                "Tenant name is required".to_string(),
            ));
        }
        if input.admin_email.trim().is_empty() {
            return Err(ProvisionError::InvalidData(
                "Admin email is required".to_string(),
            ));
        }
        if input.admin_password.is_empty() {
            return Err(ProvisionError::InvalidData(
                "Admin password is required".to_string(),
            ));
        }

        let names = TenantNames::derive(
            name,
            input.subdomain.as_deref(),
            input.db_name.as_deref(),
            &self.options.root_domain,
        )?;
        let plan_id = input
            .plan_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let _guard = self.claim(&names)?;

        self.ensure_registry().await?;

        if self
            .store
            .find_conflict(&names.name, &names.subdomain, &names.db_name)
            .await?
            .is_some()
        {
            return Err(ProvisionError::Duplicate(
                "Tenant with matching name, subdomain, or database already exists".to_string(),
            ));
        }

        if !self.store.database_exists(&names.db_name).await? {
            self.store.create_database(&names.db_name).await?;
        } else {
            tracing::info!(db_name = %names.db_name, "Reusing existing tenant database");
        }

        let database_url = self.options.server.connection(&names.db_name).url()?;

        if let Err(err) = self.migrate(&names, &database_url).await {
            log_leftover(&names, "migrations", &err);
            return Err(err);
        }

        if let Err(err) = bootstrap_admin(
            self.bootstrapper.as_ref(),
            &database_url,
            &input.admin_email,
            &input.admin_password,
            &self.options.admin,
        )
        .await
        {
            log_leftover(&names, "admin bootstrap", &err);
            return Err(err);
        }

        let tenant = self
            .store
            .insert_tenant(&NewTenant {
                name: names.name.clone(),
                subdomain: names.subdomain.clone(),
                db_name: names.db_name.clone(),
                plan_id,
            })
            .await
            .map_err(|err| {
                let err = ProvisionError::from(err);
                log_leftover(&names, "registry insert", &err);
                err
            })?;

        // A lookup before registration may have cached a miss.
        self.directory.evict(&tenant.subdomain);

        tracing::info!(
            tenant_id = %tenant.id,
            db_name = %tenant.db_name,
            subdomain = %tenant.subdomain,
            "Provisioned tenant"
        );
        Ok(tenant)
    }

    /// Remove a tenant's registry row and drop its database.
    pub async fn delete(&self, input: DeleteTenantInput) -> ProvisionResult<DeletedTenant> {
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let tenant = match (input.id, name) {
            (Some(id), None) => self.store.get_tenant(id).await?,
            (None, Some(name)) => self.store.get_tenant_by_name(name).await?,
            (None, None) => {
                return Err(ProvisionError::InvalidData(
                    "Provide a tenant id or name to delete".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ProvisionError::InvalidData(
                    "Provide either a tenant id or a name to delete, not both".to_string(),
                ));
            }
        };
        let tenant =
            tenant.ok_or_else(|| ProvisionError::NotFound("Tenant not found".to_string()))?;

        self.store.delete_tenant(tenant.id).await?;
        // Close pooled sessions first; PostgreSQL refuses to drop a database
        // with open connections.
        self.directory.forget(&tenant).await;
        self.store.drop_database(&tenant.db_name).await?;

        tracing::info!(
            tenant_id = %tenant.id,
            db_name = %tenant.db_name,
            "Deleted tenant"
        );
        Ok(DeletedTenant {
            id: tenant.id,
            name: tenant.name,
        })
    }

    /// All tenants, oldest first.
    pub async fn list(&self) -> ProvisionResult<Vec<TenantRow>> {
        Ok(self.store.list_tenants().await?)
    }

    async fn ensure_registry(&self) -> ProvisionResult<()> {
        self.registry_ready
            .get_or_try_init(|| async { self.store.migrate().await })
            .await?;
        Ok(())
    }

    async fn migrate(&self, names: &TenantNames, database_url: &str) -> ProvisionResult<()> {
        let context = MigrationContext {
            directory: self.options.migrations_dir.clone(),
            database_url: database_url.to_string(),
            project_dir: self.options.project_dir.clone(),
        };

        let run = self.migrations.run(&context);
        let result = match self.options.migration_timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ProvisionError::Database(format!(
                        "Migrations for tenant {} timed out after {}s",
                        names.name,
                        limit.as_secs()
                    )));
                }
            },
            None => run.await,
        };

        result.map_err(|err| {
            tracing::error!(
                db_name = %names.db_name,
                error = %err,
                "Tenant migrations failed"
            );
            ProvisionError::Database(format!(
                "Failed running migrations for tenant {}",
                names.name
            ))
        })
    }

    fn claim(&self, names: &TenantNames) -> ProvisionResult<InFlight<'_>> {
        let keys = vec![
            format!("name:{}", names.name),
            format!("db:{}", names.db_name),
        ];
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if keys.iter().any(|key| set.contains(key)) {
            return Err(ProvisionError::Duplicate(
                "Tenant with matching name or database is already being provisioned".to_string(),
            ));
        }
        for key in &keys {
            set.insert(key.clone());
        }
        drop(set);
        Ok(InFlight {
            keys,
            set: &self.in_flight,
        })
    }
}

fn log_leftover(names: &TenantNames, step: &str, err: &ProvisionError) {
    tracing::error!(
        db_name = %names.db_name,
        tenant = %names.name,
        step,
        error = %err,
        "Tenant provisioning failed; the tenant database was left in place"
    );
}
