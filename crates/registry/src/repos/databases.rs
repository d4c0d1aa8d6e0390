//! Physical database administration.

use crate::error::RegistryResult;
use async_trait::async_trait;

/// Creates and drops tenant databases on the database server.
///
/// Implementations validate `db_name` against the identifier grammar before
/// interpolating it into DDL.
#[async_trait]
pub trait DatabaseAdmin: Send + Sync {
    async fn database_exists(&self, db_name: &str) -> RegistryResult<bool>;

    async fn create_database(&self, db_name: &str) -> RegistryResult<()>;

    /// `DROP DATABASE IF EXISTS`.
    async fn drop_database(&self, db_name: &str) -> RegistryResult<()>;
}
