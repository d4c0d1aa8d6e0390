//! The tenant resolved for the current request.

use super::common::{TenantRecord, tenant_record};
use crate::error::{ApiError, ApiResult};
use crate::tenant::TenantContext;
use axum::Extension;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub db_name: String,
    pub generation: u64,
}

#[derive(Debug, Serialize)]
pub struct TenantContextResponse {
    pub tenant: TenantRecord,
    pub connection: ConnectionInfo,
}

/// GET /v1/tenant/context
pub async fn tenant_context(
    context: Option<Extension<TenantContext>>,
) -> ApiResult<Json<TenantContextResponse>> {
    let Some(Extension(context)) = context else {
        return Err(ApiError::NotFound(
            "No tenant is associated with this host".to_string(),
        ));
    };

    Ok(Json(TenantContextResponse {
        connection: ConnectionInfo {
            db_name: context.connection.db_name().to_string(),
            generation: context.connection.generation(),
        },
        tenant: tenant_record(context.tenant)?,
    }))
}
