//! Tenant provisioning for Tenement.
//!
//! Creating a tenant spans two databases with no shared transaction: the
//! registry and the tenant's own database. [`TenantService`] runs the steps
//! in a fixed order and relies on duplicate checks, idempotent DDL and the
//! registry's unique constraints instead of rollback.

pub mod bootstrap;
pub mod error;
pub mod migrations;
pub mod plans;
pub mod service;
pub mod signup;

pub use bootstrap::{AdminPolicy, PgBootstrapper, TenantBootstrapper, TenantSession};
pub use error::{ProvisionError, ProvisionResult};
pub use migrations::{
    CommandMigrationRunner, MigrationContext, MigrationError, MigrationRunner,
    SqlxMigrationRunner, runner_from_config,
};
pub use plans::TenantPlanService;
pub use service::{
    CreateTenantInput, DeleteTenantInput, DeletedTenant, ProvisioningOptions, TenantService,
};
pub use signup::{PlanGate, SignupInput, SignupResult, SignupService, TenantCreator};
