//! Registry store trait.

use crate::error::RegistryResult;
use crate::repos::{DatabaseAdmin, PlanRepo, TenantRepo};
use async_trait::async_trait;

/// Combined registry store trait.
#[async_trait]
pub trait RegistryStore: TenantRepo + PlanRepo + DatabaseAdmin + Send + Sync {
    /// Create registry tables and indexes if missing. Idempotent.
    async fn migrate(&self) -> RegistryResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> RegistryResult<()>;
}
