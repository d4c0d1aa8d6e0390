//! In-process memo of routing lookups.

use crate::models::TenantRow;
use std::collections::HashMap;
use std::sync::RwLock;

/// Result of consulting the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A stored answer. `None` means the tenant is known not to exist.
    Hit(Option<TenantRow>),
    Miss,
}

/// Maps lookup keys to tenant records, including negative results.
///
/// Entries never expire; they leave only through [`evict`](Self::evict) or
/// [`clear`](Self::clear). Every eviction advances an epoch so that a lookup
/// started before it cannot write its answer back afterwards.
#[derive(Debug, Default)]
pub struct TenantMetadataCache {
    inner: RwLock<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    records: HashMap<String, Option<TenantRow>>,
    evicted_at: HashMap<String, u64>,
    cleared_at: u64,
    epoch: u64,
}

impl Entries {
    fn changed_since(&self, key: &str, since: u64) -> bool {
        self.cleared_at > since || self.evicted_at.get(key).is_some_and(|at| *at > since)
    }
}

impl TenantMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Entries> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Entries> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> CacheLookup {
        match self.read().records.get(key) {
            Some(entry) => CacheLookup::Hit(entry.clone()),
            None => CacheLookup::Miss,
        }
    }

    /// Current eviction epoch. Take it before querying the registry.
    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Whether `key` was evicted (or the cache cleared) after `since`.
    pub fn changed_since(&self, key: &str, since: u64) -> bool {
        self.read().changed_since(key, since)
    }

    pub fn populate(&self, key: impl Into<String>, tenant: Option<TenantRow>) {
        self.write().records.insert(key.into(), tenant);
    }

    /// Store an answer read at epoch `since`, unless the key has been
    /// evicted since. Returns whether the entry was written.
    pub fn populate_if_current(&self, key: &str, tenant: Option<TenantRow>, since: u64) -> bool {
        let mut entries = self.write();
        if entries.changed_since(key, since) {
            return false;
        }
        entries.records.insert(key.to_string(), tenant);
        true
    }

    /// Remove an entry. Returns whether one was present.
    pub fn evict(&self, key: &str) -> bool {
        let mut entries = self.write();
        entries.epoch += 1;
        let epoch = entries.epoch;
        entries.evicted_at.insert(key.to_string(), epoch);
        entries.records.remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.write();
        entries.epoch += 1;
        entries.cleared_at = entries.epoch;
        entries.records.clear();
        entries.evicted_at.clear();
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
