//! Key-value storage substrate.
//!
//! Every collection is persisted as one JSON string under one key. The substrate only knows about
//! whole values: there is no row-level update, enumeration or transaction primitive. Two
//! implementations are provided:
//!
//! - [`MemoryStore`]: process-local map with an optional byte quota
//! - [`FileStore`]: one `<escaped key>.json` file per key under a data directory

mod file;
mod memory;

pub(crate) use file::encode_key;
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreResult;
use std::sync::Arc;

/// A synchronous string key-value store.
///
/// Implementations must make `set` all-or-nothing: after a failed `set` the previous value (or
/// absence of one) is still in place.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if the slot is empty.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes the value stored under `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Returns true if a value is stored under `key`.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Fails if `key` could never be stored, without touching any data.
    ///
    /// Multi-key operations call this for every key they will write before writing the first.
    fn check_key(&self, _key: &str) -> StoreResult<()> {
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        (**self).contains(key)
    }

    fn check_key(&self, key: &str) -> StoreResult<()> {
        (**self).check_key(key)
    }
}
