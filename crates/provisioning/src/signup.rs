//! Self-service signup: plan validation followed by provisioning.

use crate::error::{ProvisionError, ProvisionResult};
use crate::plans::TenantPlanService;
use crate::service::{CreateTenantInput, TenantService};
use async_trait::async_trait;
use std::sync::Arc;
use tenement_registry::models::TenantRow;

/// Public signup request.
#[derive(Clone, Default)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub subdomain: Option<String>,
    pub plan_id: Option<String>,
}

/// Result of a successful signup.
#[derive(Debug, Clone)]
pub struct SignupResult {
    pub tenant: TenantRow,
    pub admin_email: String,
}

/// The provisioning step signup depends on.
#[async_trait]
pub trait TenantCreator: Send + Sync {
    async fn create(&self, input: CreateTenantInput) -> ProvisionResult<TenantRow>;
}

#[async_trait]
impl TenantCreator for TenantService {
    async fn create(&self, input: CreateTenantInput) -> ProvisionResult<TenantRow> {
        TenantService::create(self, input).await
    }
}

/// The plan check signup depends on.
#[async_trait]
pub trait PlanGate: Send + Sync {
    async fn assert_active_plan(&self, plan_id: &str) -> ProvisionResult<()>;
}

#[async_trait]
impl PlanGate for TenantPlanService {
    async fn assert_active_plan(&self, plan_id: &str) -> ProvisionResult<()> {
        TenantPlanService::assert_active_plan(self, plan_id)
            .await
            .map(|_| ())
    }
}

pub struct SignupService {
    tenants: Arc<dyn TenantCreator>,
    plans: Arc<dyn PlanGate>,
    require_plan: bool,
}

impl SignupService {
    pub fn new(
        tenants: Arc<dyn TenantCreator>,
        plans: Arc<dyn PlanGate>,
        require_plan: bool,
    ) -> Self {
        Self {
            tenants,
            plans,
            require_plan,
        }
    }

    /// Validate, check the plan when present or required, then provision.
    /// Errors from the plan check and from provisioning pass through as is.
    pub async fn signup(&self, input: SignupInput) -> ProvisionResult<SignupResult> {
        if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty()
        {
            return Err(ProvisionError::InvalidData(
                "name, email, and password are required".to_string(),
            ));
        }

        let plan_id = input
            .plan_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        match &plan_id {
            Some(id) => self.plans.assert_active_plan(id).await?,
            None if self.require_plan => {
                return Err(ProvisionError::InvalidData("planId is required".to_string()));
            }
            None => {}
        }

        let admin_email = input.email.trim().to_lowercase();
        let tenant = self
            .tenants
            .create(CreateTenantInput {
                name: input.name,
                admin_email: admin_email.clone(),
                admin_password: input.password,
                subdomain: input.subdomain,
                db_name: None,
                plan_id,
            })
            .await?;

        Ok(SignupResult {
            tenant,
            admin_email,
        })
    }
}
