use super::KeyValueStore;
use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// In-memory key-value store.
///
/// Usage is measured as the sum of key and value lengths in bytes. When a quota is set, a `set`
/// that would push usage over it fails with [`StoreError::QuotaExceeded`] and leaves the store
/// unchanged.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Creates an empty store with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that holds at most `quota_bytes` bytes.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Returns the stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Returns the number of bytes currently in use.
    pub fn used_bytes(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        usage(&entries)
    }
}

fn usage(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(limit) = self.quota_bytes {
            let current = usage(&entries);
            let replaced = entries.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
            let needed = current - replaced + key.len() + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
