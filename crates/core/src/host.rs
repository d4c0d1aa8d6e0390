//! Host header normalization and tenant subdomain extraction.

use std::collections::HashSet;

/// Prefixes that never name a tenant, regardless of configuration.
pub const DEFAULT_RESERVED_PREFIXES: &[&str] = &["www", "network", "wordpress", "wp-admin", "wpadmin"];

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

/// A host that maps to a tenant lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantHost {
    /// Labels in front of the root domain (may contain dots).
    pub subdomain: String,
    /// Key used against the metadata cache and the registry.
    pub lookup_key: String,
}

/// Maps raw host header values to tenant lookup keys.
///
/// Pure and deterministic; safe to share across request tasks.
#[derive(Debug, Clone)]
pub struct HostResolver {
    root_domain: Option<String>,
    reserved: HashSet<String>,
}

impl HostResolver {
    /// Create a resolver with the default reserved prefixes plus `extra`.
    pub fn new<I, S>(root_domain: Option<&str>, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root_domain = root_domain
            .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty());

        let mut reserved: HashSet<String> = DEFAULT_RESERVED_PREFIXES
            .iter()
            .map(|p| (*p).to_string())
            .collect();
        for prefix in extra {
            let prefix = prefix.as_ref().trim().to_ascii_lowercase();
            if !prefix.is_empty() {
                reserved.insert(prefix);
            }
        }

        Self {
            root_domain,
            reserved,
        }
    }

    /// The configured root domain, normalized.
    pub fn root_domain(&self) -> Option<&str> {
        self.root_domain.as_deref()
    }

    pub fn is_reserved(&self, label: &str) -> bool {
        self.reserved.contains(&label.to_ascii_lowercase())
    }

    /// Resolve a raw header value to a tenant host, or `None` when the host
    /// does not address a tenant.
    pub fn resolve(&self, raw: &str) -> Option<TenantHost> {
        let host = normalize_host(raw)?;

        if LOOPBACK_HOSTS.contains(&host.as_str()) {
            return None;
        }

        match &self.root_domain {
            Some(root) => {
                if host == *root {
                    return None;
                }
                let subdomain = host.strip_suffix(root.as_str())?.strip_suffix('.')?;
                if subdomain.is_empty() || self.leading_label_reserved(subdomain) {
                    return None;
                }
                Some(TenantHost {
                    subdomain: subdomain.to_string(),
                    lookup_key: format!("{subdomain}.{root}"),
                })
            }
            None => {
                let (leading, rest) = host.split_once('.')?;
                if leading.is_empty() || rest.is_empty() || self.is_reserved(leading) {
                    return None;
                }
                Some(TenantHost {
                    subdomain: leading.to_string(),
                    lookup_key: leading.to_string(),
                })
            }
        }
    }

    fn leading_label_reserved(&self, subdomain: &str) -> bool {
        let leading = subdomain.split('.').next().unwrap_or(subdomain);
        self.is_reserved(leading)
    }
}

/// Normalize a raw host header value.
///
/// Takes the first comma-separated entry, lowercases it, strips the port (but
/// keeps bracketed IPv6 literals intact) and one trailing dot.
pub fn normalize_host(raw: &str) -> Option<String> {
    let first = raw.split(',').next()?.trim().to_ascii_lowercase();
    if first.is_empty() {
        return None;
    }

    let mut host = if first.starts_with('[')
        && let Some(end) = first.find(']')
    {
        first[..=end].to_string()
    } else if let Some((name, port)) = first.rsplit_once(':')
        && !name.contains(':')
        && port.chars().all(|c| c.is_ascii_digit())
    {
        name.to_string()
    } else {
        first
    };

    if host.ends_with('.') {
        host.pop();
    }

    if host.is_empty() { None } else { Some(host) }
}

/// Split comma-separated configuration lists, trimming and lowercasing entries.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
