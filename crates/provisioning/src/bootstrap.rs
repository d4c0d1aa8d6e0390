//! First administrator bootstrap for a freshly migrated tenant database.

use crate::error::{ProvisionError, ProvisionResult};
use async_trait::async_trait;
use sqlx::Connection;
use sqlx::postgres::PgConnection;

/// Administrator written into a tenant database.
#[derive(Clone)]
pub struct AdminAccount {
    /// Lowercased email.
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_super_admin: bool,
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("email", &self.email)
            .field("role", &self.role)
            .field("is_super_admin", &self.is_super_admin)
            .finish_non_exhaustive()
    }
}

/// Admin bootstrap settings.
#[derive(Debug, Clone)]
pub struct AdminPolicy {
    pub role: String,
    pub promote_to_super_admin: bool,
    pub bcrypt_cost: u32,
}

/// A direct connection to one tenant database.
#[async_trait]
pub trait TenantSession: Send {
    async fn admin_table_exists(&mut self) -> ProvisionResult<bool>;

    /// Insert the administrator, or update it when the email exists.
    async fn upsert_admin(&mut self, admin: &AdminAccount) -> ProvisionResult<()>;

    async fn close(self: Box<Self>) -> ProvisionResult<()>;
}

/// Opens [`TenantSession`]s.
#[async_trait]
pub trait TenantBootstrapper: Send + Sync {
    async fn open(&self, database_url: &str) -> ProvisionResult<Box<dyn TenantSession>>;
}

/// Check the admin table, hash the password and upsert the administrator.
///
/// The session is closed on every path. A close failure is reported only
/// when the bootstrap itself succeeded.
pub async fn bootstrap_admin(
    bootstrapper: &dyn TenantBootstrapper,
    database_url: &str,
    email: &str,
    password: &str,
    policy: &AdminPolicy,
) -> ProvisionResult<()> {
    let mut session = bootstrapper.open(database_url).await?;
    let result = seed_admin(session.as_mut(), email, password, policy).await;
    let closed = session.close().await;
    result?;
    closed
}

async fn seed_admin(
    session: &mut dyn TenantSession,
    email: &str,
    password: &str,
    policy: &AdminPolicy,
) -> ProvisionResult<()> {
    if !session.admin_table_exists().await? {
        return Err(ProvisionError::UnexpectedState(
            "Tenant database is missing the administrator table after migrations".to_string(),
        ));
    }

    let password_hash = hash_password(password, policy.bcrypt_cost).await?;
    let admin = AdminAccount {
        email: email.trim().to_lowercase(),
        password_hash,
        role: policy.role.clone(),
        is_super_admin: policy.promote_to_super_admin,
    };
    session.upsert_admin(&admin).await
}

/// bcrypt off the async executor.
pub async fn hash_password(password: &str, cost: u32) -> ProvisionResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ProvisionError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| ProvisionError::Internal(format!("password hashing failed: {e}")))
}

/// Opens plain PostgreSQL connections.
#[derive(Debug, Default, Clone)]
pub struct PgBootstrapper;

pub struct PgTenantSession {
    conn: PgConnection,
}

#[async_trait]
impl TenantBootstrapper for PgBootstrapper {
    async fn open(&self, database_url: &str) -> ProvisionResult<Box<dyn TenantSession>> {
        let conn = PgConnection::connect(database_url)
            .await
            .map_err(|e| ProvisionError::Database(format!("tenant connection failed: {e}")))?;
        Ok(Box::new(PgTenantSession { conn }))
    }
}

fn db_error(e: sqlx::Error) -> ProvisionError {
    ProvisionError::Database(e.to_string())
}

#[async_trait]
impl TenantSession for PgTenantSession {
    async fn admin_table_exists(&mut self) -> ProvisionResult<bool> {
        sqlx::query_scalar::<_, bool>(r#"SELECT to_regclass('public."user"') IS NOT NULL"#)
            .fetch_one(&mut self.conn)
            .await
            .map_err(db_error)
    }

    async fn upsert_admin(&mut self, admin: &AdminAccount) -> ProvisionResult<()> {
        sqlx::query(
            r#"
            INSERT INTO public."user" (
                id, email, password_hash, role, is_super_admin, created_at, updated_at
            )
            VALUES (gen_random_uuid(), $1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (email) DO UPDATE
            SET password_hash = EXCLUDED.password_hash,
                role = EXCLUDED.role,
                is_super_admin = EXCLUDED.is_super_admin,
                updated_at = NOW()
            "#,
        )
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(&admin.role)
        .bind(admin.is_super_admin)
        .execute(&mut self.conn)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> ProvisionResult<()> {
        self.conn.close().await.map_err(db_error)
    }
}
