//! Public self-service signup.

use super::common::{TenantRecord, tenant_record};
use super::tenants::record;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::validation::{non_blank, normalize_subdomain, validate_email, validate_password};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tenement_provisioning::SignupInput;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupAdmin {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub tenant: TenantRecord,
    pub admin: SignupAdmin,
}

/// POST /v1/public/tenants/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    // Missing fields are reported by the signup service; only check the
    // shape of what was supplied.
    let email = if req.email.trim().is_empty() {
        String::new()
    } else {
        validate_email(&req.email)?
    };
    if !req.password.is_empty() {
        validate_password(&req.password)?;
    }
    let subdomain = normalize_subdomain(req.subdomain.as_deref(), &state.root_domain())?;

    let result = state
        .signup
        .signup(SignupInput {
            name: req.name,
            email,
            password: req.password,
            subdomain,
            plan_id: non_blank(req.plan_id),
        })
        .await;
    record("signup", &result);
    let result = result?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            tenant: tenant_record(result.tenant)?,
            admin: SignupAdmin {
                email: result.admin_email,
            },
        }),
    ))
}
