//! Configuration types shared across crates.

use crate::database_url::PostgresConnection;
use crate::host::{HostResolver, parse_list};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Resolve tenants from `X-Forwarded-Host` when present (default: false).
    /// Only enable behind a reverse proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_host: bool,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:9000".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            trust_forwarded_host: false,
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Admin token configuration.
///
/// Admin endpoints accept a bearer token whose SHA-256 hash matches
/// `token_hash`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Pre-computed hash of the admin token (SHA256 hex, 64 characters).
    /// Generate with: `echo -n "your-secret-token" | sha256sum`
    pub token_hash: String,
}

impl AdminConfig {
    /// Create a test configuration with a dummy token hash.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            // SHA256 of "test-admin-token"
            token_hash: "17d6bfe05d1b1fb7bc499f8e3f639c7b3eda4c40f321eef8887a0c04c89a99c5"
                .to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let hash = self.token_hash.trim();
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("admin.token_hash must be a 64 character SHA256 hex digest".to_string());
        }
        Ok(())
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Shared tenant registry database.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Connection URL. Takes precedence over individual fields.
    pub url: Option<String>,
    pub host: Option<String>,
    #[serde(default = "default_pg_port")]
    pub port: Option<u16>,
    pub username: Option<String>,
    /// WARNING: Prefer TENEMENT_REGISTRY__PASSWORD over storing in config.
    pub password: Option<String>,
    pub database: Option<String>,
    pub ssl_mode: Option<PgSslMode>,
    #[serde(default = "default_registry_max_connections")]
    pub max_connections: u32,
    /// PostgreSQL cancels registry queries exceeding this duration.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: Option<u64>,
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_registry_max_connections() -> u32 {
    10
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

impl RegistryConfig {
    pub fn for_testing() -> Self {
        Self {
            url: None,
            host: Some("localhost".to_string()),
            port: default_pg_port(),
            username: Some("postgres".to_string()),
            password: Some("postgres".to_string()),
            database: Some("postgres".to_string()),
            ssl_mode: Some(PgSslMode::Disable),
            max_connections: default_registry_max_connections(),
            statement_timeout_ms: default_statement_timeout_ms(),
        }
    }

    /// Validate registry configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match (self.url.as_ref(), self.host.as_ref(), self.database.as_ref()) {
            (Some(_), _, _) => {}
            (None, Some(_), Some(_)) => {}
            (None, None, _) => {
                return Err(
                    "registry config requires either 'url' or 'host' + 'database'".to_string(),
                );
            }
            (None, Some(_), None) => {
                return Err(
                    "registry config requires 'database' when using individual fields".to_string(),
                );
            }
        }
        if self.max_connections == 0 {
            return Err("registry.max_connections must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Server that hosts tenant databases.
///
/// Unset fields fall back to the registry's individual fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantDatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: Option<PgSslMode>,
    /// Pool size for each tenant database.
    #[serde(default = "default_tenant_max_connections")]
    pub max_connections: u32,
}

fn default_tenant_max_connections() -> u32 {
    5
}

impl Default for TenantDatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            username: None,
            password: None,
            ssl_mode: None,
            max_connections: default_tenant_max_connections(),
        }
    }
}

/// Fully resolved tenant database server settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantServer {
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub ssl_mode: PgSslMode,
    pub max_connections: u32,
}

impl TenantServer {
    /// Connection parameters for one tenant database on this server.
    pub fn connection(&self, database: &str) -> PostgresConnection {
        PostgresConnection {
            host: self.host.clone(),
            port: self.port,
            username: Some(self.username.clone()),
            password: Some(self.password.clone()),
            database: database.to_string(),
        }
    }
}

impl TenantDatabaseConfig {
    /// Merge with the registry settings and require host and credentials.
    pub fn resolve(&self, registry: &RegistryConfig) -> Result<TenantServer, String> {
        fn pick(own: &Option<String>, fallback: &Option<String>) -> Option<String> {
            own.clone()
                .or_else(|| fallback.clone())
                .filter(|v| !v.trim().is_empty())
        }

        let host = pick(&self.host, &registry.host).ok_or_else(|| {
            "tenant_database.host is required when the registry has no 'host'".to_string()
        })?;
        let username = pick(&self.username, &registry.username).ok_or_else(|| {
            "tenant database credentials are required: set username".to_string()
        })?;
        let password = pick(&self.password, &registry.password).ok_or_else(|| {
            "tenant database credentials are required: set password".to_string()
        })?;

        Ok(TenantServer {
            host,
            port: self.port.or(registry.port),
            username,
            password,
            ssl_mode: self.ssl_mode.or(registry.ssl_mode).unwrap_or_default(),
            max_connections: self.max_connections,
        })
    }

    pub fn validate(&self, registry: &RegistryConfig) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("tenant_database.max_connections must be at least 1".to_string());
        }
        self.resolve(registry).map(|_| ())
    }
}

/// Host-based tenant routing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Root domain tenants live under (e.g. "example.com").
    pub root_domain: Option<String>,
    /// Extra reserved hosts, e.g. `"network,blog"`.
    #[serde(default, deserialize_with = "string_or_list")]
    pub network_hosts: Vec<String>,
    /// Extra prefixes that never map to a tenant.
    #[serde(default, deserialize_with = "string_or_list")]
    pub non_tenant_prefixes: Vec<String>,
}

/// Root domain used for derived subdomains when routing has none configured.
pub const DEFAULT_ROOT_DOMAIN: &str = "example.com";

impl RoutingConfig {
    pub fn resolver(&self) -> HostResolver {
        HostResolver::new(
            self.root_domain.as_deref(),
            self.network_hosts
                .iter()
                .chain(self.non_tenant_prefixes.iter()),
        )
    }

    /// Root domain for newly provisioned tenant subdomains.
    pub fn provisioning_root_domain(&self) -> String {
        self.root_domain
            .as_deref()
            .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOT_DOMAIN.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    String(String),
    List(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::String(value) => parse_list(&value),
        StringOrList::List(values) => values.iter().flat_map(|v| parse_list(v)).collect(),
    })
}

/// How tenant migrations are executed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MigrationConfig {
    /// Embedded sqlx migrator reading `.sql` files from a directory.
    Sqlx {
        #[serde(default = "default_migrations_dir")]
        directory: PathBuf,
    },
    /// External migration command. Receives `DATABASE_URL`,
    /// `TENANT_MIGRATIONS_DIR` and optionally `PROJECT_DIR`,
    /// `TENANT_ENTITIES_GLOB`, `TENANT_MIGRATIONS_GLOB` in its environment.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_migrations_dir")]
        directory: PathBuf,
        project_dir: Option<PathBuf>,
        entities_glob: Option<String>,
        migrations_glob: Option<String>,
    },
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("./migrations")
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::Sqlx {
            directory: default_migrations_dir(),
        }
    }
}

impl MigrationConfig {
    pub fn directory(&self) -> &PathBuf {
        match self {
            Self::Sqlx { directory } | Self::Command { directory, .. } => directory,
        }
    }

    pub fn project_dir(&self) -> Option<&PathBuf> {
        match self {
            Self::Sqlx { .. } => None,
            Self::Command { project_dir, .. } => project_dir.as_ref(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Self::Command { program, .. } = self
            && program.trim().is_empty()
        {
            return Err("provisioning.migrations.program must not be empty".to_string());
        }
        Ok(())
    }
}

/// Tenant provisioning behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Role stored on the bootstrapped administrator.
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    #[serde(default = "default_promote_to_super_admin")]
    pub promote_to_super_admin: bool,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Signup requires a plan id (default: true).
    #[serde(default = "default_require_plan")]
    pub require_plan: bool,
    /// Upper bound for a single tenant migration run. Unset means unbounded.
    pub migration_timeout_secs: Option<u64>,
    #[serde(default)]
    pub migrations: MigrationConfig,
}

fn default_admin_role() -> String {
    "admin".to_string()
}

fn default_promote_to_super_admin() -> bool {
    true
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_require_plan() -> bool {
    true
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            admin_role: default_admin_role(),
            promote_to_super_admin: default_promote_to_super_admin(),
            bcrypt_cost: default_bcrypt_cost(),
            require_plan: default_require_plan(),
            migration_timeout_secs: None,
            migrations: MigrationConfig::default(),
        }
    }
}

impl ProvisioningConfig {
    pub fn migration_timeout(&self) -> Option<std::time::Duration> {
        self.migration_timeout_secs
            .map(std::time::Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.admin_role.trim().is_empty() {
            return Err("provisioning.admin_role must not be empty".to_string());
        }
        // bcrypt accepts costs 4 through 31
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(format!(
                "provisioning.bcrypt_cost {} is outside the supported range 4..=31",
                self.bcrypt_cost
            ));
        }
        if self.migration_timeout_secs == Some(0) {
            return Err("provisioning.migration_timeout_secs cannot be 0".to_string());
        }
        self.migrations.validate()
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Admin token configuration (required).
    pub admin: AdminConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub tenant_database: TenantDatabaseConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Points at a local PostgreSQL with default
    /// credentials and a dummy admin token.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            admin: AdminConfig::for_testing(),
            registry: RegistryConfig::for_testing(),
            tenant_database: TenantDatabaseConfig::default(),
            routing: RoutingConfig {
                root_domain: Some(DEFAULT_ROOT_DOMAIN.to_string()),
                ..RoutingConfig::default()
            },
            provisioning: ProvisioningConfig {
                bcrypt_cost: 4,
                ..ProvisioningConfig::default()
            },
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.admin.validate()?;
        self.registry.validate()?;
        self.tenant_database.validate(&self.registry)?;
        self.provisioning.validate()?;
        Ok(())
    }
}
