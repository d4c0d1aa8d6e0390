//! In-memory registry store.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tenement_registry::models::{NewTenant, TenantPlanRow, TenantRow};
use tenement_registry::repos::{DatabaseAdmin, PlanRepo, TenantRepo};
use tenement_registry::{RegistryError, RegistryResult, RegistryStore};
use time::OffsetDateTime;
use uuid::Uuid;

/// Registry store backed by vectors.
#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryRegistry {
    pub tenants: Mutex<Vec<TenantRow>>,
    pub plans: Mutex<Vec<TenantPlanRow>>,
    pub databases: Mutex<HashSet<String>>,
    pub subdomain_lookups: AtomicUsize,
    /// Make lookups and health checks fail as if the registry were down.
    pub unavailable: AtomicBool,
}

#[allow(dead_code)]
impl MemoryRegistry {
    pub fn lookups(&self) -> usize {
        self.subdomain_lookups.load(Ordering::SeqCst)
    }

    pub fn add_plan(&self, id: &str, is_active: bool) {
        let mut plans = self.plans.lock().unwrap();
        let mut plan = TenantPlanRow::new(id, id, is_active);
        plan.created_at += time::Duration::seconds(plans.len() as i64);
        plans.push(plan);
    }

    pub fn has_database(&self, db_name: &str) -> bool {
        self.databases.lock().unwrap().contains(db_name)
    }

    fn check_available(&self) -> RegistryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn find(&self, pred: impl Fn(&TenantRow) -> bool) -> Option<TenantRow> {
        self.tenants.lock().unwrap().iter().find(|t| pred(t)).cloned()
    }
}

#[async_trait]
impl TenantRepo for MemoryRegistry {
    async fn find_conflict(
        &self,
        name: &str,
        subdomain: &str,
        db_name: &str,
    ) -> RegistryResult<Option<TenantRow>> {
        self.check_available()?;
        Ok(self.find(|t| t.name == name || t.subdomain == subdomain || t.db_name == db_name))
    }

    async fn insert_tenant(&self, tenant: &NewTenant) -> RegistryResult<TenantRow> {
        let mut tenants = self.tenants.lock().unwrap();
        if tenants.iter().any(|t| {
            t.name == tenant.name || t.subdomain == tenant.subdomain || t.db_name == tenant.db_name
        }) {
            return Err(RegistryError::AlreadyExists(tenant.name.clone()));
        }
        let now = OffsetDateTime::now_utc() + time::Duration::milliseconds(tenants.len() as i64);
        let row = TenantRow {
            id: Uuid::new_v4(),
            name: tenant.name.clone(),
            subdomain: tenant.subdomain.clone(),
            db_name: tenant.db_name.clone(),
            plan_id: tenant.plan_id.clone(),
            created_at: now,
            updated_at: now,
        };
        tenants.push(row.clone());
        Ok(row)
    }

    async fn get_tenant(&self, id: Uuid) -> RegistryResult<Option<TenantRow>> {
        Ok(self.find(|t| t.id == id))
    }

    async fn get_tenant_by_name(&self, name: &str) -> RegistryResult<Option<TenantRow>> {
        Ok(self.find(|t| t.name == name))
    }

    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> RegistryResult<Option<TenantRow>> {
        self.check_available()?;
        self.subdomain_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.find(|t| t.subdomain == subdomain))
    }

    async fn delete_tenant(&self, id: Uuid) -> RegistryResult<()> {
        let mut tenants = self.tenants.lock().unwrap();
        let before = tenants.len();
        tenants.retain(|t| t.id != id);
        if tenants.len() == before {
            return Err(RegistryError::NotFound(format!("tenant {id}")));
        }
        Ok(())
    }

    async fn list_tenants(&self) -> RegistryResult<Vec<TenantRow>> {
        self.check_available()?;
        let mut tenants = self.tenants.lock().unwrap().clone();
        tenants.sort_by_key(|t| t.created_at);
        Ok(tenants)
    }
}

#[async_trait]
impl PlanRepo for MemoryRegistry {
    async fn get_active_plan(&self, plan_id: &str) -> RegistryResult<Option<TenantPlanRow>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == plan_id && p.is_active)
            .cloned())
    }

    async fn list_active_plan_ids(&self) -> RegistryResult<Vec<String>> {
        let plans = self.plans.lock().unwrap();
        Ok(plans
            .iter()
            .filter(|p| p.is_active)
            .map(|p| p.id.clone())
            .collect())
    }

    async fn get_plan(&self, plan_id: &str) -> RegistryResult<Option<TenantPlanRow>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == plan_id)
            .cloned())
    }

    async fn upsert_plan(&self, plan: &TenantPlanRow) -> RegistryResult<()> {
        let mut plans = self.plans.lock().unwrap();
        plans.retain(|p| p.id != plan.id);
        plans.push(plan.clone());
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdmin for MemoryRegistry {
    async fn database_exists(&self, db_name: &str) -> RegistryResult<bool> {
        Ok(self.has_database(db_name))
    }

    async fn create_database(&self, db_name: &str) -> RegistryResult<()> {
        self.databases.lock().unwrap().insert(db_name.to_string());
        Ok(())
    }

    async fn drop_database(&self, db_name: &str) -> RegistryResult<()> {
        self.databases.lock().unwrap().remove(db_name);
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistry {
    async fn migrate(&self) -> RegistryResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<()> {
        self.check_available()
    }
}
