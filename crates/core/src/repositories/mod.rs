//! Repository operations over the key-value store.
//!
//! [`Repository`] owns the in-memory record shapes and the business rules: identifier
//! allocation, cascading deletes and metadata bookkeeping. Every operation reads the full
//! collection it touches, mutates a copy, and writes the full collection back.
//!
//! The operations are split by record family:
//!
//! - [`patients`]: patient CRUD and the cascading delete
//! - [`notes`]: clinical notes
//! - [`events`]: calendar events, including the date filters and the patient-name join
//! - [`vitals`] and [`medications`]: per-patient lists
//! - [`metadata`] and [`stats`]: derived snapshots
//! - [`backup`]: export, import and clear
//! - [`sample`]: demo data seeding
//!
//! ## Concurrency
//!
//! Mutations are serialised through one process-local lock. Separate processes sharing a
//! `FileStore` directory can still overwrite each other's collections (last write wins).

pub mod backup;
pub mod events;
pub mod medications;
pub mod metadata;
pub mod notes;
pub mod patients;
pub mod sample;
pub mod stats;
pub mod vitals;

use crate::collection::{Collections, SlotRead};
use crate::config::CoreConfig;
use crate::constants::MAX_ID_ATTEMPTS;
use crate::error::{StoreError, StoreResult};
use crate::keys::StorageKeys;
use crate::records::{CalendarEvent, ClinicalNote, Patient, StorageMetadata};
use crate::store::{FileStore, KeyValueStore};
use mediq_ids::{RecordId, RecordKind};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// REPOSITORY
// ============================================================================

/// Record store for one namespace of a key-value store.
///
/// Generic over the substrate so tests can run against [`crate::MemoryStore`] and binaries
/// against [`FileStore`].
pub struct Repository<S> {
    cfg: Arc<CoreConfig>,
    keys: StorageKeys,
    collections: Collections<S>,
    write_lock: Mutex<()>,
}

impl Repository<FileStore> {
    /// Opens a repository backed by a [`FileStore`] rooted at the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the data directory cannot be created.
    pub fn open(cfg: Arc<CoreConfig>) -> StoreResult<Self> {
        let store = FileStore::open(cfg.data_dir())?;
        Ok(Self::new(cfg, store))
    }
}

impl<S: KeyValueStore> Repository<S> {
    /// Creates a repository over `store`, namespaced by the configured storage namespace.
    pub fn new(cfg: Arc<CoreConfig>, store: S) -> Self {
        let keys = StorageKeys::new(cfg.storage_namespace());
        Self {
            cfg,
            keys,
            collections: Collections::new(store),
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Returns the underlying key-value store.
    pub fn store(&self) -> &S {
        self.collections.store()
    }

    /// Reports whether each fixed collection is missing, readable, or unreadable.
    ///
    /// Ordinary reads treat an unreadable collection as empty; this is how a caller finds out
    /// that something was stored but could not be parsed.
    pub fn inspect_collections(&self) -> Vec<CollectionHealth> {
        vec![
            self.inspect::<Vec<Patient>>(self.keys.patients()),
            self.inspect::<Vec<ClinicalNote>>(self.keys.clinical_notes()),
            self.inspect::<Vec<CalendarEvent>>(self.keys.calendar_events()),
            self.inspect::<StorageMetadata>(self.keys.metadata()),
            self.inspect::<u32>(self.keys.patient_sequence()),
        ]
    }

    fn inspect<T: DeserializeOwned>(&self, key: String) -> CollectionHealth {
        let state = match self.collections.read::<T>(&key) {
            SlotRead::Missing => SlotState::Missing,
            SlotRead::Loaded(_) => SlotState::Loaded,
            SlotRead::Recovered { reason } => SlotState::Recovered(reason),
        };
        CollectionHealth { key, state }
    }

    // ------------------------------------------------------------------------
    // shared helpers for the operation modules
    // ------------------------------------------------------------------------

    pub(crate) fn collections(&self) -> &Collections<S> {
        &self.collections
    }

    /// Acquires the write lock. A panic in another writer does not leave the store unusable,
    /// so a poisoned lock is taken over.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn read_patients(&self) -> Vec<Patient> {
        self.collections.read_collection(&self.keys.patients())
    }

    pub(crate) fn read_notes(&self) -> Vec<ClinicalNote> {
        self.collections.read_collection(&self.keys.clinical_notes())
    }

    pub(crate) fn read_events(&self) -> Vec<CalendarEvent> {
        self.collections.read_collection(&self.keys.calendar_events())
    }

    /// Strict counterparts of the readers above, for read-modify-write paths. An unreadable
    /// collection fails with `StoreError::Unreadable` instead of reading as empty.
    pub(crate) fn load_patients(&self) -> StoreResult<Vec<Patient>> {
        self.collections.read_for_update(&self.keys.patients())
    }

    pub(crate) fn load_notes(&self) -> StoreResult<Vec<ClinicalNote>> {
        self.collections.read_for_update(&self.keys.clinical_notes())
    }

    pub(crate) fn load_events(&self) -> StoreResult<Vec<CalendarEvent>> {
        self.collections.read_for_update(&self.keys.calendar_events())
    }

    pub(crate) fn patient_exists(&self, patient_id: &str) -> bool {
        self.read_patients().iter().any(|p| p.id == patient_id)
    }
}

// ============================================================================
// COLLECTION HEALTH
// ============================================================================

/// State of one storage slot as reported by [`Repository::inspect_collections`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Missing,
    Loaded,
    /// Present but unreadable; ordinary reads substitute an empty value.
    Recovered(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHealth {
    pub key: String,
    pub state: SlotState,
}

// ============================================================================
// ID ALLOCATION
// ============================================================================

/// Generates a record id of `kind` that `taken` does not report as already in use.
///
/// Retries up to `MAX_ID_ATTEMPTS` times with fresh random suffixes.
///
/// # Errors
///
/// Returns `StoreError::IdAllocation` if every attempt collided.
pub(crate) fn allocate_record_id(
    kind: RecordKind,
    taken: impl Fn(&str) -> bool,
) -> StoreResult<String> {
    allocate_with(|| RecordId::generate(kind).to_string(), taken, kind.prefix())
}

/// Retry loop behind [`allocate_record_id`], with the generator injected for tests.
pub(crate) fn allocate_with(
    mut generate: impl FnMut() -> String,
    taken: impl Fn(&str) -> bool,
    what: &'static str,
) -> StoreResult<String> {
    for _attempt in 0..MAX_ID_ATTEMPTS {
        let candidate = generate();
        if !taken(&candidate) {
            return Ok(candidate);
        }
        tracing::debug!("generated {} id {} already in use, retrying", what, candidate);
    }
    Err(StoreError::IdAllocation(what))
}
