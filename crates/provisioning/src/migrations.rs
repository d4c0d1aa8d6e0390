//! Tenant database migration runners.
//!
//! The provisioning workflow only depends on [`MigrationRunner`]; what a
//! migration actually is stays behind that seam.

use async_trait::async_trait;
use sqlx::Connection;
use sqlx::postgres::PgConnection;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tenement_core::config::MigrationConfig;
use thiserror::Error;

/// Everything a runner needs to migrate one tenant database.
#[derive(Clone)]
pub struct MigrationContext {
    pub directory: PathBuf,
    pub database_url: String,
    pub project_dir: Option<PathBuf>,
}

impl std::fmt::Debug for MigrationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationContext")
            .field("directory", &self.directory)
            .field("database_url", &"<redacted>")
            .field("project_dir", &self.project_dir)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to start migration command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("migration command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },
}

#[async_trait]
pub trait MigrationRunner: Send + Sync {
    async fn run(&self, context: &MigrationContext) -> Result<(), MigrationError>;
}

/// Applies `.sql` migrations from a directory with sqlx's migrator.
#[derive(Debug, Default, Clone)]
pub struct SqlxMigrationRunner;

#[async_trait]
impl MigrationRunner for SqlxMigrationRunner {
    async fn run(&self, context: &MigrationContext) -> Result<(), MigrationError> {
        let migrator = sqlx::migrate::Migrator::new(context.directory.as_path()).await?;
        let mut conn = PgConnection::connect(&context.database_url).await?;
        let result = migrator.run_direct(&mut conn).await;
        let closed = conn.close().await;
        result?;
        closed?;
        Ok(())
    }
}

/// Runs an external command with the tenant database in its environment.
///
/// Exported variables: `DATABASE_URL`, `TENANT_MIGRATIONS_DIR`, and when
/// configured `PROJECT_DIR`, `TENANT_ENTITIES_GLOB`, `TENANT_MIGRATIONS_GLOB`.
/// The command runs in `project_dir` when one is set.
#[derive(Debug, Clone)]
pub struct CommandMigrationRunner {
    program: String,
    args: Vec<String>,
    entities_glob: Option<String>,
    migrations_glob: Option<String>,
}

const STDERR_TAIL_BYTES: usize = 2048;

impl CommandMigrationRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            entities_glob: None,
            migrations_glob: None,
        }
    }

    pub fn with_globs(mut self, entities: Option<String>, migrations: Option<String>) -> Self {
        self.entities_glob = entities;
        self.migrations_glob = migrations;
        self
    }
}

#[async_trait]
impl MigrationRunner for CommandMigrationRunner {
    async fn run(&self, context: &MigrationContext) -> Result<(), MigrationError> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .env("DATABASE_URL", &context.database_url)
            .env("TENANT_MIGRATIONS_DIR", &context.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(project_dir) = &context.project_dir {
            command.current_dir(project_dir).env("PROJECT_DIR", project_dir);
        }
        if let Some(glob) = &self.entities_glob {
            command.env("TENANT_ENTITIES_GLOB", glob);
        }
        if let Some(glob) = &self.migrations_glob {
            command.env("TENANT_MIGRATIONS_GLOB", glob);
        }

        tracing::debug!(program = %self.program, "Running tenant migration command");
        let output = command.output().await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let start = stderr
            .char_indices()
            .rev()
            .nth(STDERR_TAIL_BYTES)
            .map_or(0, |(i, _)| i);
        Err(MigrationError::CommandFailed {
            status: output.status.to_string(),
            stderr: stderr[start..].trim().to_string(),
        })
    }
}

/// Build the runner described by configuration.
pub fn runner_from_config(config: &MigrationConfig) -> Arc<dyn MigrationRunner> {
    match config {
        MigrationConfig::Sqlx { .. } => Arc::new(SqlxMigrationRunner),
        MigrationConfig::Command {
            program,
            args,
            entities_glob,
            migrations_glob,
            ..
        } => Arc::new(
            CommandMigrationRunner::new(program.clone(), args.clone())
                .with_globs(entities_glob.clone(), migrations_glob.clone()),
        ),
    }
}
