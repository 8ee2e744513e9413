//! Identifier generation for MedIQ records.
//!
//! Three identifier families are issued by the record store:
//!
//! - [`PatientId`]: a zero-padded sequence number (`001`, `002`, ...). The sequence is owned by
//!   the caller (the store persists the last issued value), so an id freed by deletion is never
//!   handed out again.
//! - [`Mrn`]: the human-facing medical record number, `MRN-<year>-<patient id>-<5 chars>`, where
//!   the suffix is drawn from `A-Z0-9`.
//! - [`RecordId`]: `<prefix>-<unix millis>-<6 chars>` for notes, events, vitals, medications
//!   and uploaded documents. The random suffix (`a-z0-9`) keeps two records created in the
//!   same millisecond apart.
//!
//! Randomness comes from UUID v4 bits, so no separate RNG is needed.

mod service;

pub use service::{Mrn, PatientId, RecordId, RecordKind};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
