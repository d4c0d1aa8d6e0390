//! Tenant listing and admin tenant management.

use super::common::{TenantListResponse, TenantResponse, tenant_record, tenant_records};
use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;
use crate::validation::{
    non_blank, normalize_subdomain, parse_identifier, validate_email, validate_password,
};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tenement_provisioning::{CreateTenantInput, ProvisionResult};

/// GET /v1/public/tenants and GET /v1/admin/tenants
pub async fn list_tenants(State(state): State<AppState>) -> ApiResult<Json<TenantListResponse>> {
    let tenants = state.tenants.list().await?;
    Ok(Json(TenantListResponse {
        tenants: tenant_records(tenants)?,
    }))
}

/// Admin create request.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub admin_email: String,
    #[serde(default)]
    pub admin_password: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
}

/// POST /v1/admin/tenants
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(req): Json<CreateTenantRequest>,
) -> ApiResult<(StatusCode, Json<TenantResponse>)> {
    let admin_email = validate_email(&req.admin_email)?;
    validate_password(&req.admin_password)?;
    let subdomain = normalize_subdomain(req.subdomain.as_deref(), &state.root_domain())?;

    let plan_id = non_blank(req.plan_id);
    if let Some(plan_id) = &plan_id {
        state.plans.assert_active_plan(plan_id).await?;
    }

    let result = state
        .tenants
        .create(CreateTenantInput {
            name: req.name,
            admin_email,
            admin_password: req.admin_password,
            subdomain,
            db_name: None,
            plan_id,
        })
        .await;
    record("create", &result);
    let tenant = result?;

    Ok((
        StatusCode::CREATED,
        Json(TenantResponse {
            tenant: tenant_record(tenant)?,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct DeletedTenantRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteTenantResponse {
    pub deleted: DeletedTenantRecord,
}

/// DELETE /v1/admin/tenants/{identifier}
///
/// A UUID identifier deletes by id, anything else by name.
pub async fn delete_tenant(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<DeleteTenantResponse>> {
    let input = parse_identifier(&identifier)?;

    let result = state.tenants.delete(input).await;
    record("delete", &result);
    metrics::POOL_HANDLES.set(state.directory.pool().len() as i64);
    let deleted = result?;

    Ok(Json(DeleteTenantResponse {
        deleted: DeletedTenantRecord {
            id: deleted.id.to_string(),
            name: deleted.name,
        },
    }))
}

pub(crate) fn record<T>(operation: &str, result: &ProvisionResult<T>) {
    match result {
        Ok(_) => metrics::record_provisioning(operation, "ok"),
        Err(e) => metrics::record_provisioning(operation, e.kind()),
    }
}
