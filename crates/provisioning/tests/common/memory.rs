//! In-memory registry store for deterministic tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tenement_registry::models::{NewTenant, TenantPlanRow, TenantRow};
use tenement_registry::repos::{DatabaseAdmin, PlanRepo, TenantRepo};
use tenement_registry::{RegistryError, RegistryResult, RegistryStore};
use time::OffsetDateTime;
use uuid::Uuid;

/// Registry store backed by vectors, with call counters.
#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryRegistry {
    pub tenants: Mutex<Vec<TenantRow>>,
    pub plans: Mutex<Vec<TenantPlanRow>>,
    pub databases: Mutex<HashSet<String>>,
    pub migrate_calls: AtomicUsize,
    pub conflict_checks: AtomicUsize,
    pub create_database_calls: AtomicUsize,
    pub drop_database_calls: AtomicUsize,
    pub subdomain_lookups: AtomicUsize,
    /// Make `find_conflict` report nothing, as a concurrent writer would
    /// observe before the other insert commits.
    pub hide_conflicts: AtomicBool,
}

#[allow(dead_code)]
impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn has_database(&self, db_name: &str) -> bool {
        self.databases.lock().unwrap().contains(db_name)
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.lock().unwrap().len()
    }

    pub fn add_plan(&self, id: &str, is_active: bool) {
        let mut plan = TenantPlanRow::new(id, id, is_active);
        // Keep creation order strictly increasing.
        let offset = self.plans.lock().unwrap().len() as i64;
        plan.created_at += time::Duration::seconds(offset);
        self.plans.lock().unwrap().push(plan);
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
        self.conflict_checks.fetch_add(1, Ordering::SeqCst);
        if self.hide_conflicts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name == name || t.subdomain == subdomain || t.db_name == db_name)
            .cloned())
    }

    async fn insert_tenant(&self, tenant: &NewTenant) -> RegistryResult<TenantRow> {
        let mut tenants = self.tenants.lock().unwrap();
        if tenants.iter().any(|t| {
            t.name == tenant.name || t.subdomain == tenant.subdomain || t.db_name == tenant.db_name
        }) {
            return Err(RegistryError::AlreadyExists(format!(
                "tenant '{}' violates unique constraint",
                tenant.name
            )));
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
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn get_tenant_by_name(&self, name: &str) -> RegistryResult<Option<TenantRow>> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> RegistryResult<Option<TenantRow>> {
        self.subdomain_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.subdomain == subdomain)
            .cloned())
    }

    async fn delete_tenant(&self, id: Uuid) -> RegistryResult<()> {
        let mut tenants = self.tenants.lock().unwrap();
        let before = tenants.len();
        tenants.retain(|t| t.id != id);
        if tenants.len() == before {
            return Err(RegistryError::NotFound(format!("tenant {id} not found")));
        }
        Ok(())
    }

    async fn list_tenants(&self) -> RegistryResult<Vec<TenantRow>> {
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
        let mut plans: Vec<TenantPlanRow> = self
            .plans
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.created_at);
        Ok(plans.into_iter().map(|p| p.id).collect())
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
        self.create_database_calls.fetch_add(1, Ordering::SeqCst);
        if !self.databases.lock().unwrap().insert(db_name.to_string()) {
            return Err(RegistryError::AlreadyExists(format!("database {db_name}")));
        }
        Ok(())
    }

    async fn drop_database(&self, db_name: &str) -> RegistryResult<()> {
        self.drop_database_calls.fetch_add(1, Ordering::SeqCst);
        self.databases.lock().unwrap().remove(db_name);
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistry {
    async fn migrate(&self) -> RegistryResult<()> {
        self.migrate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<()> {
        Ok(())
    }
}
