//! Host to tenant connection resolution.

use crate::cache::{CacheLookup, TenantMetadataCache};
use crate::error::{RegistryError, RegistryResult};
use crate::models::TenantRow;
use crate::pool::{ConnectionHandle, ConnectionPool, TenantConnector};
use crate::repos::TenantRepo;
use std::sync::Arc;
use tenement_core::HostResolver;

const RESOLVE_ATTEMPTS: usize = 3;

/// A tenant bound to its live connection.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: TenantRow,
    pub connection: Arc<ConnectionHandle>,
}

/// Outcome of resolving a host.
#[derive(Debug)]
pub enum Resolution {
    /// The host does not address a tenant (root, reserved, loopback, foreign).
    NotTenantHost,
    /// The host addresses a tenant that is not registered.
    Unknown { lookup_key: String, cached: bool },
    /// The tenant exists and its connection is ready.
    Tenant {
        context: TenantContext,
        cached: bool,
    },
}

impl Resolution {
    pub fn into_context(self) -> Option<TenantContext> {
        match self {
            Resolution::Tenant { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Owns the metadata cache and the connection pool.
///
/// Shared across request tasks through `Arc`.
pub struct TenantDirectory {
    resolver: HostResolver,
    registry: Arc<dyn TenantRepo>,
    cache: TenantMetadataCache,
    pool: ConnectionPool,
}

impl TenantDirectory {
    pub fn new(
        resolver: HostResolver,
        registry: Arc<dyn TenantRepo>,
        connector: Arc<dyn TenantConnector>,
    ) -> Self {
        Self {
            resolver,
            registry,
            cache: TenantMetadataCache::new(),
            pool: ConnectionPool::new(connector),
        }
    }

    pub fn resolver(&self) -> &HostResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &TenantMetadataCache {
        &self.cache
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Resolve a raw host header to a tenant and its connection.
    ///
    /// Registry failures are not cached. A registered tenant whose connection
    /// cannot be opened stays cached; only the connection error is returned.
    /// A tenant evicted while its connection was being opened is resolved
    /// again, and the connection opened for it is closed.
    pub async fn resolve(&self, raw_host: &str) -> RegistryResult<Resolution> {
        let Some(host) = self.resolver.resolve(raw_host) else {
            return Ok(Resolution::NotTenantHost);
        };

        for _ in 0..RESOLVE_ATTEMPTS {
            let (tenant, cached, since) = self.lookup_since(&host.lookup_key).await?;
            let Some(tenant) = tenant else {
                return Ok(Resolution::Unknown {
                    lookup_key: host.lookup_key,
                    cached,
                });
            };

            let connection = self.pool.acquire(&tenant.db_name).await?;
            if !self.cache.changed_since(&host.lookup_key, since) {
                return Ok(Resolution::Tenant {
                    context: TenantContext { tenant, connection },
                    cached,
                });
            }

            tracing::debug!(
                lookup_key = %host.lookup_key,
                db_name = %tenant.db_name,
                "Tenant evicted during resolution"
            );
            self.pool.release(&tenant.db_name).await;
            connection.pool().close().await;
        }

        Err(RegistryError::Internal(format!(
            "tenant for '{}' kept changing during resolution",
            host.lookup_key
        )))
    }

    /// Look up a key through the cache. Returns the record and whether it
    /// came from the cache.
    ///
    /// An answer read before a concurrent eviction of the same key is not
    /// cached; the registry is queried again instead.
    pub async fn lookup(&self, lookup_key: &str) -> RegistryResult<(Option<TenantRow>, bool)> {
        let (tenant, cached, _) = self.lookup_since(lookup_key).await?;
        Ok((tenant, cached))
    }

    /// [`lookup`](Self::lookup), plus the cache epoch the answer is valid at.
    async fn lookup_since(
        &self,
        lookup_key: &str,
    ) -> RegistryResult<(Option<TenantRow>, bool, u64)> {
        let mut since = self.cache.epoch();
        if let CacheLookup::Hit(tenant) = self.cache.get(lookup_key) {
            return Ok((tenant, true, since));
        }

        let mut tenant = None;
        for _ in 0..RESOLVE_ATTEMPTS {
            since = self.cache.epoch();
            tenant = self.registry.get_tenant_by_subdomain(lookup_key).await?;
            tracing::debug!(
                lookup_key = %lookup_key,
                found = tenant.is_some(),
                "Tenant registry lookup"
            );
            if self.cache.populate_if_current(lookup_key, tenant.clone(), since) {
                break;
            }
            tracing::debug!(lookup_key = %lookup_key, "Discarding lookup raced by eviction");
        }
        Ok((tenant, false, since))
    }

    /// Drop cached lookups for a tenant subdomain.
    pub fn evict(&self, subdomain: &str) {
        let subdomain = subdomain.trim().to_ascii_lowercase();
        if let Some(host) = self.resolver.resolve(&subdomain)
            && host.lookup_key != subdomain
        {
            self.cache.evict(&host.lookup_key);
        }
        self.cache.evict(&subdomain);
    }

    /// Close the pooled connection for a tenant database.
    pub async fn release(&self, db_name: &str) -> bool {
        self.pool.release(db_name).await
    }

    /// Evict and release everything held for `tenant`.
    pub async fn forget(&self, tenant: &TenantRow) {
        self.evict(&tenant.subdomain);
        self.release(&tenant.db_name).await;
    }

    /// Release every connection and clear the cache.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
        self.cache.clear();
    }
}
