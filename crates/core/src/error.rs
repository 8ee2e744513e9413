use std::fmt;

/// The record families that can be looked up by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Patient,
    ClinicalNote,
    CalendarEvent,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::Patient => "Patient",
            RecordType::ClinicalNote => "Note",
            RecordType::CalendarEvent => "Event",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} with ID {id} not found")]
    NotFound { kind: RecordType, id: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error(
        "storage quota exceeded writing {key}: {needed} bytes needed, {limit} bytes allowed"
    )]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
    #[error("failed to serialize {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to allocate a unique {0} after {attempts} attempts", attempts = crate::constants::MAX_ID_ATTEMPTS)]
    IdAllocation(&'static str),
    #[error("stored {key} is unreadable and was left untouched: {reason}")]
    Unreadable { key: String, reason: String },
    #[error("invalid import format: {0}")]
    ImportFormat(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("identifier error: {0}")]
    Id(#[from] mediq_ids::IdError),
    #[error("text error: {0}")]
    Text(#[from] mediq_types::TextError),
}

impl StoreError {
    pub(crate) fn not_found(kind: RecordType, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
