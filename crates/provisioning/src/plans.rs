//! Tenant plan validation.

use crate::error::{ProvisionError, ProvisionResult};
use std::sync::Arc;
use tenement_registry::models::TenantPlanRow;
use tenement_registry::repos::PlanRepo;

/// Read access to plans with the "must be active" policy applied.
#[derive(Clone)]
pub struct TenantPlanService {
    plans: Arc<dyn PlanRepo>,
}

impl TenantPlanService {
    pub fn new(plans: Arc<dyn PlanRepo>) -> Self {
        Self { plans }
    }

    /// Return the plan if it exists and is active.
    pub async fn assert_active_plan(&self, plan_id: &str) -> ProvisionResult<TenantPlanRow> {
        let plan_id = plan_id.trim();
        if plan_id.is_empty() {
            return Err(ProvisionError::InvalidData(
                "A planId must be provided".to_string(),
            ));
        }

        self.plans
            .get_active_plan(plan_id)
            .await?
            .ok_or_else(|| {
                ProvisionError::InvalidData("The requested plan is not available".to_string())
            })
    }

    /// Active plan IDs, oldest first.
    pub async fn list_active_ids(&self) -> ProvisionResult<Vec<String>> {
        Ok(self.plans.list_active_plan_ids().await?)
    }

    /// Any plan by ID, active or not. Blank IDs yield `None`.
    pub async fn retrieve(&self, plan_id: &str) -> ProvisionResult<Option<TenantPlanRow>> {
        let plan_id = plan_id.trim();
        if plan_id.is_empty() {
            return Ok(None);
        }
        Ok(self.plans.get_plan(plan_id).await?)
    }
}
