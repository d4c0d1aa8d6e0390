//! Database row models.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A registered tenant.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TenantRow {
    pub id: Uuid,
    pub name: String,
    /// Fully-qualified host, e.g. `acme-corp.example.com`.
    pub subdomain: String,
    pub db_name: String,
    pub plan_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Values for a tenant about to be registered. `id` and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    pub db_name: String,
    pub plan_id: Option<String>,
}

/// A subscription plan tenants may be bound to.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TenantPlanRow {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TenantPlanRow {
    pub fn new(id: impl Into<String>, name: impl Into<String>, is_active: bool) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: id.into(),
            name: name.into(),
            is_active,
            created_at: now,
            updated_at: now,
        }
    }
}
