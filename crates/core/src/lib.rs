//! # MedIQ Core
//!
//! Record store for a single-clinic dashboard: patients, clinical notes, calendar events and
//! per-patient vitals and medications.
//!
//! Records are kept as whole JSON collections in a namespaced key-value store:
//! - [`store`]: the key-value substrate ([`MemoryStore`], [`FileStore`])
//! - [`collection`]: JSON reads (fail-open) and writes (fail-loud) over the substrate
//! - [`repositories`]: CRUD, cascading deletes, metadata, stats, export/import and sample data
//! - [`records`]: the persisted record shapes
//!
//! Alongside the store:
//! - [`dose`]: dose-string parsing
//! - [`prescription`]: Markdown prescription documents
//! - [`collaborators`]: transcription, insight and document upload interfaces
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and
//! `mediq-cli`.

pub mod collaborators;
pub mod collection;
pub mod config;
pub mod constants;
pub mod dose;
pub mod error;
pub mod keys;
pub mod prescription;
pub mod records;
pub mod repositories;
pub mod store;

pub use config::{CoreConfig, StatusTransitions};
pub use constants::{DEFAULT_DATA_DIR, DEFAULT_STORAGE_NAMESPACE};
pub use error::{RecordType, StoreError, StoreResult};
pub use repositories::backup::{ExportScope, ImportSummary};
pub use repositories::{CollectionHealth, Repository, SlotState};
pub use store::{FileStore, KeyValueStore, MemoryStore};

pub use mediq_ids::{Mrn, PatientId, RecordId, RecordKind};
pub use mediq_types::NonEmptyText;
