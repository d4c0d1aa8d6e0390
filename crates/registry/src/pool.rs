//! Per-tenant connection pool.
//!
//! Holds at most one live [`ConnectionHandle`] per tenant database. Handles
//! are created lazily on first [`acquire`](ConnectionPool::acquire) and torn
//! down only by [`release`](ConnectionPool::release) or
//! [`shutdown`](ConnectionPool::shutdown).

use crate::error::{RegistryError, RegistryResult};
use crate::postgres::sqlx_ssl_mode;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tenement_core::config::TenantServer;
use tenement_core::naming::validate_identifier;
use tokio::sync::OnceCell;

/// Opens the query surface for one tenant database.
#[async_trait]
pub trait TenantConnector: Send + Sync {
    async fn connect(&self, db_name: &str) -> RegistryResult<PgPool>;
}

/// Connects to tenant databases on a single PostgreSQL server.
pub struct PostgresConnector {
    server: TenantServer,
}

impl PostgresConnector {
    pub fn new(server: TenantServer) -> Self {
        Self { server }
    }

    /// Connect options for `db_name` on this server.
    pub fn connect_options(&self, db_name: &str) -> PgConnectOptions {
        let mut opts = PgConnectOptions::new()
            .host(&self.server.host)
            .username(&self.server.username)
            .password(&self.server.password)
            .database(db_name)
            .ssl_mode(sqlx_ssl_mode(self.server.ssl_mode));
        if let Some(port) = self.server.port {
            opts = opts.port(port);
        }
        opts
    }
}

#[async_trait]
impl TenantConnector for PostgresConnector {
    async fn connect(&self, db_name: &str) -> RegistryResult<PgPool> {
        validate_identifier(db_name, "database name")?;
        PgPoolOptions::new()
            .max_connections(self.server.max_connections)
            .connect_with(self.connect_options(db_name))
            .await
            .map_err(|e| RegistryError::Connection {
                db_name: db_name.to_string(),
                message: e.to_string(),
            })
    }
}

/// A live connection to one tenant database.
#[derive(Debug)]
pub struct ConnectionHandle {
    generation: u64,
    db_name: String,
    pool: PgPool,
}

impl ConnectionHandle {
    /// Distinct for every handle the owning pool constructs.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn is_initialized(&self) -> bool {
        !self.pool.is_closed()
    }
}

type Slot = Arc<OnceCell<Arc<ConnectionHandle>>>;

/// Owns the connection handles for every tenant database.
pub struct ConnectionPool {
    connector: Arc<dyn TenantConnector>,
    slots: Mutex<HashMap<String, Slot>>,
    next_generation: AtomicU64,
}

impl ConnectionPool {
    pub fn new(connector: Arc<dyn TenantConnector>) -> Self {
        Self {
            connector,
            slots: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Return the live handle for `db_name`, creating it if needed.
    ///
    /// Concurrent callers for the same database wait on a single
    /// construction. A failed construction is reported to every waiter and
    /// leaves no handle behind.
    pub async fn acquire(&self, db_name: &str) -> RegistryResult<Arc<ConnectionHandle>> {
        // A handle closed behind our back is replaced once.
        for _ in 0..2 {
            let slot = self.slot(db_name);
            let handle = slot
                .get_or_try_init(|| self.open(db_name))
                .await?
                .clone();
            if handle.is_initialized() {
                return Ok(handle);
            }
            tracing::warn!(
                db_name = %db_name,
                generation = handle.generation(),
                "Discarding closed tenant connection"
            );
            self.remove_slot(db_name, &slot);
        }
        Err(RegistryError::Connection {
            db_name: db_name.to_string(),
            message: "connection closed during initialization".to_string(),
        })
    }

    /// Close and forget the handle for `db_name`. Returns whether one existed.
    pub async fn release(&self, db_name: &str) -> bool {
        let slot = self.lock().remove(db_name);
        match slot.as_ref().and_then(|slot| slot.get()) {
            Some(handle) => {
                handle.pool.close().await;
                tracing::debug!(
                    db_name = %db_name,
                    generation = handle.generation(),
                    "Released tenant connection"
                );
                true
            }
            None => false,
        }
    }

    /// Release every handle.
    pub async fn shutdown(&self) {
        let slots: Vec<(String, Slot)> = self.lock().drain().collect();
        let count = slots.len();
        for (_, slot) in slots {
            if let Some(handle) = slot.get() {
                handle.pool.close().await;
            }
        }
        tracing::info!(count, "Closed tenant connections");
    }

    /// Whether a live handle exists for `db_name`.
    pub fn contains(&self, db_name: &str) -> bool {
        self.lock()
            .get(db_name)
            .and_then(|slot| slot.get())
            .is_some_and(|handle| handle.is_initialized())
    }

    /// Number of databases with a handle or a construction in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn open(&self, db_name: &str) -> RegistryResult<Arc<ConnectionHandle>> {
        let pool = self.connector.connect(db_name).await?;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        tracing::info!(db_name = %db_name, generation, "Opened tenant connection");
        Ok(Arc::new(ConnectionHandle {
            generation,
            db_name: db_name.to_string(),
            pool,
        }))
    }

    fn slot(&self, db_name: &str) -> Slot {
        self.lock()
            .entry(db_name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn remove_slot(&self, db_name: &str, expected: &Slot) {
        let mut slots = self.lock();
        if slots
            .get(db_name)
            .is_some_and(|current| Arc::ptr_eq(current, expected))
        {
            slots.remove(db_name);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}
