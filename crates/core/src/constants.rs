//! Constants used throughout the MedIQ core crate.
//!
//! Storage key names and defaults live here so the persisted layout is defined in one place.

/// Default namespace prefixed to every storage key.
pub const DEFAULT_STORAGE_NAMESPACE: &str = "mediq";

/// Default directory for the file-backed store when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "mediq_data";

/// Subdirectory of the data directory that holds uploaded documents by default.
pub const DOCUMENTS_DIR: &str = "documents";

/// Schema version written into the storage metadata snapshot.
pub const STORAGE_VERSION: &str = "1.0.0";

/// Key suffix for the patient collection.
pub const PATIENTS_KEY: &str = "patients";

/// Key suffix for the clinical note collection.
pub const CLINICAL_NOTES_KEY: &str = "clinical_notes";

/// Key suffix for the calendar event collection.
pub const CALENDAR_EVENTS_KEY: &str = "calendar_events";

/// Key prefix for per-patient vitals collections.
pub const VITALS_PREFIX: &str = "vitals";

/// Key prefix for per-patient medication collections.
pub const MEDICATIONS_PREFIX: &str = "medications";

/// Key suffix for the metadata snapshot.
pub const METADATA_KEY: &str = "metadata";

/// Key suffix for the last issued patient sequence number.
pub const PATIENT_SEQUENCE_KEY: &str = "patient_sequence";

/// Maximum length of a storage namespace.
pub const MAX_NAMESPACE_LEN: usize = 64;

/// How many freshly generated identifiers are tried before giving up on a collision.
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Placeholder transcript returned when no transcription service is configured.
pub const PLACEHOLDER_TRANSCRIPT: &str = "Mock transcription: This is a placeholder transcription. Configure a transcription service to enable real transcription.";

/// Longest doctor name accepted on a prescription.
pub const MAX_DOCTOR_NAME_LEN: usize = 120;

/// Longest free-text body accepted on a prescription.
pub const MAX_PRESCRIPTION_CONTENT_LEN: usize = 10_000;
