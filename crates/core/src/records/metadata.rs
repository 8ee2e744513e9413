use crate::constants::STORAGE_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of collection sizes, recomputed after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StorageMetadata {
    pub version: String,
    pub last_sync: DateTime<Utc>,
    pub patient_count: usize,
    pub note_count: usize,
    pub event_count: usize,
}

impl StorageMetadata {
    /// An empty snapshot stamped now, used when nothing readable is stored.
    pub fn empty() -> Self {
        Self {
            version: STORAGE_VERSION.to_string(),
            last_sync: Utc::now(),
            patient_count: 0,
            note_count: 0,
            event_count: 0,
        }
    }
}

impl Default for StorageMetadata {
    fn default() -> Self {
        Self::empty()
    }
}

/// Dashboard counters, computed fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_patients: usize,
    /// Patients whose status is anything but inactive.
    pub active_patients: usize,
    pub total_notes: usize,
    pub today_appointments: usize,
    pub urgent_patients: usize,
    pub last_updated: DateTime<Utc>,
}
