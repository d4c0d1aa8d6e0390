//! Tenant plan repository.

use crate::error::RegistryResult;
use crate::models::TenantPlanRow;
use async_trait::async_trait;

/// Repository for tenant plans.
#[async_trait]
pub trait PlanRepo: Send + Sync {
    /// Get a plan only if it exists and is active.
    async fn get_active_plan(&self, plan_id: &str) -> RegistryResult<Option<TenantPlanRow>>;

    /// IDs of active plans, in creation order.
    async fn list_active_plan_ids(&self) -> RegistryResult<Vec<String>>;

    /// Get a plan regardless of its active flag.
    async fn get_plan(&self, plan_id: &str) -> RegistryResult<Option<TenantPlanRow>>;

    /// Insert or update a plan.
    async fn upsert_plan(&self, plan: &TenantPlanRow) -> RegistryResult<()>;
}
