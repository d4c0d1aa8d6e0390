//! PostgreSQL-based registry store implementation.

use crate::error::{RegistryError, RegistryResult};
use crate::models::{NewTenant, TenantPlanRow, TenantRow};
use crate::repos::{DatabaseAdmin, PlanRepo, TenantRepo};
use crate::store::RegistryStore;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use tenement_core::config::PgSslMode;
use tenement_core::naming::quote_identifier;
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// Map the config SSL mode onto sqlx's.
pub fn sqlx_ssl_mode(mode: PgSslMode) -> SqlxPgSslMode {
    match mode {
        PgSslMode::Disable => SqlxPgSslMode::Disable,
        PgSslMode::Prefer => SqlxPgSslMode::Prefer,
        PgSslMode::Require => SqlxPgSslMode::Require,
    }
}

/// PostgreSQL-based registry store.
///
/// The same pool serves registry queries and database DDL, so the configured
/// role needs `CREATEDB`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> RegistryResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a store from individual connection parameters.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> RegistryResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }
        if let Some(pass) = password {
            opts = opts.password(pass);
        }
        if let Some(mode) = ssl_mode {
            opts = opts.ssl_mode(sqlx_ssl_mode(mode));
        }

        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to registry database"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> RegistryResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl RegistryStore for PostgresStore {
    async fn migrate(&self) -> RegistryResult<()> {
        // Prepared statements cannot hold more than one command.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TenantRepo for PostgresStore {
    async fn find_conflict(
        &self,
        name: &str,
        subdomain: &str,
        db_name: &str,
    ) -> RegistryResult<Option<TenantRow>> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT * FROM tenant WHERE name = $1 OR subdomain = $2 OR db_name = $3 LIMIT 1",
        )
        .bind(name)
        .bind(subdomain)
        .bind(db_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_tenant(&self, tenant: &NewTenant) -> RegistryResult<TenantRow> {
        sqlx::query_as::<_, TenantRow>(
            r#"
            INSERT INTO tenant (name, subdomain, db_name, plan_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(&tenant.db_name)
        .bind(&tenant.plan_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RegistryError::from_insert(e, &format!("tenant '{}'", tenant.name)))
    }

    async fn get_tenant(&self, id: Uuid) -> RegistryResult<Option<TenantRow>> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenant WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_tenant_by_name(&self, name: &str) -> RegistryResult<Option<TenantRow>> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenant WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_tenant_by_subdomain(&self, subdomain: &str) -> RegistryResult<Option<TenantRow>> {
        let row =
            sqlx::query_as::<_, TenantRow>("SELECT * FROM tenant WHERE subdomain = $1 LIMIT 1")
                .bind(subdomain)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn delete_tenant(&self, id: Uuid) -> RegistryResult<()> {
        let result = sqlx::query("DELETE FROM tenant WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RegistryError::NotFound(format!("tenant {id} not found")));
        }
        Ok(())
    }

    async fn list_tenants(&self) -> RegistryResult<Vec<TenantRow>> {
        let rows = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenant ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl PlanRepo for PostgresStore {
    async fn get_active_plan(&self, plan_id: &str) -> RegistryResult<Option<TenantPlanRow>> {
        let row = sqlx::query_as::<_, TenantPlanRow>(
            "SELECT * FROM tenant_plan WHERE id = $1 AND is_active = TRUE",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_active_plan_ids(&self) -> RegistryResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM tenant_plan WHERE is_active = TRUE ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn get_plan(&self, plan_id: &str) -> RegistryResult<Option<TenantPlanRow>> {
        let row = sqlx::query_as::<_, TenantPlanRow>("SELECT * FROM tenant_plan WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert_plan(&self, plan: &TenantPlanRow) -> RegistryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_plan (id, name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&plan.id)
        .bind(&plan.name)
        .bind(plan.is_active)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdmin for PostgresStore {
    async fn database_exists(&self, db_name: &str) -> RegistryResult<bool> {
        let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(db_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn create_database(&self, db_name: &str) -> RegistryResult<()> {
        let ddl = format!("CREATE DATABASE {}", quote_identifier(db_name)?);
        // CREATE DATABASE cannot run inside a transaction block; raw_sql uses
        // the simple query protocol.
        sqlx::raw_sql(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::from_insert(e, &format!("database {db_name}")))?;
        tracing::info!(db_name = %db_name, "Created tenant database");
        Ok(())
    }

    async fn drop_database(&self, db_name: &str) -> RegistryResult<()> {
        let ddl = format!("DROP DATABASE IF EXISTS {}", quote_identifier(db_name)?);
        sqlx::raw_sql(&ddl).execute(&self.pool).await?;
        tracing::info!(db_name = %db_name, "Dropped tenant database");
        Ok(())
    }
}
