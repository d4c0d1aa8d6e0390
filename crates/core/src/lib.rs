//! Core domain rules shared across the Tenement crates.
//!
//! This crate defines the pieces that need no I/O:
//! - Configuration types for the registry, tenant databases, routing and provisioning
//! - Host header normalization and subdomain extraction
//! - Tenant naming rules (slugs, database identifiers, default subdomains)
//! - PostgreSQL connection URL construction

pub mod config;
pub mod database_url;
pub mod error;
pub mod host;
pub mod naming;

pub use database_url::{PostgresConnection, build_postgres_url};
pub use error::{Error, Result};
pub use host::{HostResolver, TenantHost};
pub use naming::{TenantNames, is_valid_identifier, slugify};
