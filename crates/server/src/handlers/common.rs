//! Shared response shapes.

use crate::error::{ApiError, ApiResult};
use serde::Serialize;
use tenement_registry::models::TenantRow;
use time::format_description::well_known::Rfc3339;

/// A tenant as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    pub db_name: String,
    pub plan_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub fn tenant_record(row: TenantRow) -> ApiResult<TenantRecord> {
    let created_at = row
        .created_at
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format timestamp: {e}")))?;
    let updated_at = row
        .updated_at
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("failed to format timestamp: {e}")))?;

    Ok(TenantRecord {
        id: row.id.to_string(),
        name: row.name,
        subdomain: row.subdomain,
        db_name: row.db_name,
        plan_id: row.plan_id,
        created_at,
        updated_at,
    })
}

pub fn tenant_records(rows: Vec<TenantRow>) -> ApiResult<Vec<TenantRecord>> {
    rows.into_iter().map(tenant_record).collect()
}

/// `{tenant: ...}`
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub tenant: TenantRecord,
}

/// `{tenants: [...]}`
#[derive(Debug, Serialize)]
pub struct TenantListResponse {
    pub tenants: Vec<TenantRecord>,
}
