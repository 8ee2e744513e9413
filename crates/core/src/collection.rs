//! JSON codec over the key-value substrate.
//!
//! Reads are fail-open: a slot that cannot be read or parsed is reported as
//! [`SlotRead::Recovered`], and the convenience readers substitute an empty/default value so the
//! caller keeps working. Writes are fail-loud: any substrate error propagates unchanged.
//!
//! Read-modify-write paths use [`Collections::read_for_update`] instead, which refuses to start
//! from an unreadable slot. Writing back the empty substitute would silently drop whatever the
//! slot still holds.

use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Outcome of reading one storage slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotRead<T> {
    /// Nothing is stored under the key.
    Missing,
    /// The stored value parsed successfully.
    Loaded(T),
    /// Something is stored but could not be read or parsed.
    Recovered { reason: String },
}

impl<T> SlotRead<T> {
    pub fn is_recovered(&self) -> bool {
        matches!(self, SlotRead::Recovered { .. })
    }

    /// Returns the loaded value, if any.
    pub fn loaded(self) -> Option<T> {
        match self {
            SlotRead::Loaded(value) => Some(value),
            SlotRead::Missing | SlotRead::Recovered { .. } => None,
        }
    }
}

impl<T: Default> SlotRead<T> {
    /// Returns the loaded value, or the default for `Missing` and `Recovered`.
    pub fn into_inner_or_default(self) -> T {
        self.loaded().unwrap_or_default()
    }
}

/// Whole-value JSON reads and writes over a [`KeyValueStore`].
#[derive(Debug)]
pub struct Collections<S> {
    store: S,
}

impl<S: KeyValueStore> Collections<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads and parses the value stored under `key`.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> SlotRead<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return SlotRead::Missing,
            Err(e) => {
                return SlotRead::Recovered {
                    reason: e.to_string(),
                }
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => SlotRead::Loaded(value),
            Err(e) => SlotRead::Recovered {
                reason: e.to_string(),
            },
        }
    }

    /// Reads a collection, substituting an empty one when the slot is missing or unreadable.
    pub fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.read_or_default(key)
    }

    /// Reads a value, substituting the default when the slot is missing or unreadable.
    pub fn read_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let read = self.read(key);
        if let SlotRead::Recovered { reason } = &read {
            tracing::warn!("unreadable storage slot {} treated as empty: {}", key, reason);
        }
        read.into_inner_or_default()
    }

    /// Reads a value that is about to be modified and written back.
    ///
    /// A missing slot yields the default.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unreadable` if something is stored but cannot be read or parsed.
    pub fn read_for_update<T: DeserializeOwned + Default>(&self, key: &str) -> StoreResult<T> {
        match self.read(key) {
            SlotRead::Missing => Ok(T::default()),
            SlotRead::Loaded(value) => Ok(value),
            SlotRead::Recovered { reason } => Err(StoreError::Unreadable {
                key: key.to_string(),
                reason,
            }),
        }
    }

    /// Fails if the substrate could never store `key`.
    pub fn check_key(&self, key: &str) -> StoreResult<()> {
        self.store.check_key(key)
    }

    /// Serialises `value` and stores it under `key`.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &raw)
    }

    /// Removes the slot under `key`. Idempotent.
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        self.store.remove(key)
    }

    /// Returns true if anything is stored under `key`.
    pub fn exists(&self, key: &str) -> StoreResult<bool> {
        self.store.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_read_missing() {
        let collections = Collections::new(MemoryStore::new());
        let read: SlotRead<Vec<u32>> = collections.read("k");
        assert_eq!(read, SlotRead::Missing);
        assert!(collections.read_collection::<u32>("k").is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let collections = Collections::new(MemoryStore::new());
        collections.write("k", &[1u32, 2, 3]).unwrap();
        assert_eq!(collections.read::<Vec<u32>>("k"), SlotRead::Loaded(vec![1, 2, 3]));
        assert_eq!(collections.store().get("k").unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn test_corrupt_slot_is_recovered_as_empty() {
        let collections = Collections::new(MemoryStore::new());
        collections.store().set("k", "{not json").unwrap();

        let read: SlotRead<Vec<u32>> = collections.read("k");
        assert!(read.is_recovered());
        assert!(collections.read_collection::<u32>("k").is_empty());
        // The corrupt value is left in place for inspection.
        assert_eq!(collections.store().get("k").unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn test_read_for_update_refuses_corrupt_slot() {
        let collections = Collections::new(MemoryStore::new());
        assert!(collections.read_for_update::<Vec<u32>>("k").unwrap().is_empty());

        collections.store().set("k", "[1,\"two\"]").unwrap();
        let err = collections.read_for_update::<Vec<u32>>("k").unwrap_err();
        assert!(matches!(err, StoreError::Unreadable { ref key, .. } if key == "k"));
    }

    #[test]
    fn test_wrong_shape_is_recovered() {
        let collections = Collections::new(MemoryStore::new());
        collections.store().set("k", "{\"a\":1}").unwrap();
        assert!(collections.read::<Vec<u32>>("k").is_recovered());
    }

    #[test]
    fn test_write_propagates_quota_error() {
        let collections = Collections::new(MemoryStore::with_quota(4));
        let err = collections.write("k", &[1u32, 2, 3]).unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        assert!(!collections.exists("k").unwrap());
    }
}
