//! Application state shared across handlers.

use std::sync::Arc;
use tenement_core::config::AppConfig;
use tenement_provisioning::{
    MigrationRunner, ProvisionResult, ProvisioningOptions, SignupService, TenantBootstrapper,
    TenantPlanService, TenantService,
};
use tenement_registry::{RegistryStore, TenantConnector, TenantDirectory};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Tenant registry.
    pub registry: Arc<dyn RegistryStore>,
    /// Metadata cache and tenant connection pool.
    pub directory: Arc<TenantDirectory>,
    pub tenants: Arc<TenantService>,
    pub plans: Arc<TenantPlanService>,
    pub signup: Arc<SignupService>,
}

impl AppState {
    /// Wire the services around one registry store.
    ///
    /// Fails when the configuration lacks the credentials provisioning needs
    /// to reach tenant databases.
    pub fn new<S>(
        config: AppConfig,
        store: Arc<S>,
        connector: Arc<dyn TenantConnector>,
        migrations: Arc<dyn MigrationRunner>,
        bootstrapper: Arc<dyn TenantBootstrapper>,
    ) -> ProvisionResult<Self>
    where
        S: RegistryStore + 'static,
    {
        let options = ProvisioningOptions::from_config(&config)?;

        let directory = Arc::new(TenantDirectory::new(
            config.routing.resolver(),
            store.clone(),
            connector,
        ));
        let tenants = Arc::new(TenantService::new(
            store.clone(),
            directory.clone(),
            migrations,
            bootstrapper,
            options,
        )?);
        let plans = Arc::new(TenantPlanService::new(store.clone()));
        let signup = Arc::new(SignupService::new(
            tenants.clone(),
            plans.clone(),
            config.provisioning.require_plan,
        ));

        Ok(Self {
            config: Arc::new(config),
            registry: store,
            directory,
            tenants,
            plans,
            signup,
        })
    }

    /// Root domain used to qualify bare subdomains.
    pub fn root_domain(&self) -> String {
        self.config.routing.provisioning_root_domain()
    }
}
