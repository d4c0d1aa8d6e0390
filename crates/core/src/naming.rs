//! Tenant naming rules.
//!
//! A tenant name is reduced to a slug, and the slug derives the default
//! database name and the default subdomain. Database names end up inside DDL
//! statements that cannot take bind parameters, so every identifier must pass
//! [`validate_identifier`] before it is interpolated anywhere.

use crate::error::{Error, Result};

/// Prefix for derived tenant database names.
pub const DB_NAME_PREFIX: &str = "db_";

/// PostgreSQL truncates identifiers longer than this many bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Reduce a name to a URL-safe slug.
///
/// Lowercases, replaces every run of characters outside `[a-z0-9]` with a
/// single `-`, and trims leading and trailing hyphens.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Whether `value` matches `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate an identifier against the allow-list grammar.
pub fn validate_identifier(value: &str, label: &'static str) -> Result<()> {
    if !is_valid_identifier(value) || value.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidIdentifier {
            label,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Quote a validated identifier for use in DDL.
///
/// Returns an error instead of quoting anything outside the allow-list.
pub fn quote_identifier(value: &str) -> Result<String> {
    validate_identifier(value, "identifier")?;
    Ok(format!("\"{value}\""))
}

/// Default database name for a slug (`acme-corp` -> `db_acme_corp`).
pub fn default_db_name(slug: &str) -> String {
    format!("{DB_NAME_PREFIX}{}", slug.replace('-', "_"))
}

/// Default fully-qualified subdomain for a slug.
pub fn default_subdomain(slug: &str, root_domain: &str) -> String {
    format!("{slug}.{root_domain}")
}

/// Derived identity of a tenant about to be provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantNames {
    /// Trimmed human label.
    pub name: String,
    pub slug: String,
    pub db_name: String,
    pub subdomain: String,
}

impl TenantNames {
    /// Derive names from a tenant name and optional overrides.
    ///
    /// The database name (derived or overridden) is validated against the
    /// identifier grammar; overrides are otherwise taken as given.
    pub fn derive(
        name: &str,
        subdomain: Option<&str>,
        db_name: Option<&str>,
        root_domain: &str,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidName("tenant name is required".to_string()));
        }

        let slug = slugify(name);
        if slug.is_empty() {
            return Err(Error::InvalidName(
                "tenant name must include alphanumeric characters".to_string(),
            ));
        }

        let db_name = db_name
            .map(str::to_string)
            .unwrap_or_else(|| default_db_name(&slug));
        validate_identifier(&db_name, "database name")?;

        let subdomain = subdomain
            .map(str::to_string)
            .unwrap_or_else(|| default_subdomain(&slug, root_domain));

        Ok(Self {
            name: name.to_string(),
            slug,
            db_name,
            subdomain,
        })
    }
}
