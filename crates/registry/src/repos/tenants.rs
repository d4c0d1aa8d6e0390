//! Tenant repository.

use crate::error::RegistryResult;
use crate::models::{NewTenant, TenantRow};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for tenant records.
#[async_trait]
pub trait TenantRepo: Send + Sync {
    /// Find any tenant whose name, subdomain or database name matches.
    async fn find_conflict(
        &self,
        name: &str,
        subdomain: &str,
        db_name: &str,
    ) -> RegistryResult<Option<TenantRow>>;

    /// Insert a tenant. Unique violations surface as `AlreadyExists`.
    async fn insert_tenant(&self, tenant: &NewTenant) -> RegistryResult<TenantRow>;

    async fn get_tenant(&self, id: Uuid) -> RegistryResult<Option<TenantRow>>;

    async fn get_tenant_by_name(&self, name: &str) -> RegistryResult<Option<TenantRow>>;

    /// Look up a tenant by its subdomain (the routing lookup key).
    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> RegistryResult<Option<TenantRow>>;

    /// Delete a tenant by ID. Returns `NotFound` when no row matched.
    async fn delete_tenant(&self, id: Uuid) -> RegistryResult<()>;

    /// All tenants, oldest first.
    async fn list_tenants(&self) -> RegistryResult<Vec<TenantRow>>;
}
