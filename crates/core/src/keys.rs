//! Namespaced storage keys.
//!
//! | Key | Contents |
//! |---|---|
//! | `<ns>_patients` | JSON array of Patient |
//! | `<ns>_clinical_notes` | JSON array of ClinicalNote |
//! | `<ns>_calendar_events` | JSON array of CalendarEvent |
//! | `<ns>_vitals_<patientId>` | JSON array of PatientVital |
//! | `<ns>_medications_<patientId>` | JSON array of PatientMedication |
//! | `<ns>_metadata` | StorageMetadata object |
//! | `<ns>_patient_sequence` | last issued patient sequence number |

use crate::constants::{
    CALENDAR_EVENTS_KEY, CLINICAL_NOTES_KEY, MEDICATIONS_PREFIX, METADATA_KEY,
    PATIENTS_KEY, PATIENT_SEQUENCE_KEY, VITALS_PREFIX,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    /// Creates the key set for `namespace`. The namespace is expected to be validated already
    /// (see `CoreConfig::new`).
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.namespace, suffix)
    }

    pub fn patients(&self) -> String {
        self.key(PATIENTS_KEY)
    }

    pub fn clinical_notes(&self) -> String {
        self.key(CLINICAL_NOTES_KEY)
    }

    pub fn calendar_events(&self) -> String {
        self.key(CALENDAR_EVENTS_KEY)
    }

    pub fn metadata(&self) -> String {
        self.key(METADATA_KEY)
    }

    pub fn patient_sequence(&self) -> String {
        self.key(PATIENT_SEQUENCE_KEY)
    }

    pub fn vitals(&self, patient_id: &str) -> String {
        format!("{}_{}_{}", self.namespace, VITALS_PREFIX, patient_id)
    }

    pub fn medications(&self, patient_id: &str) -> String {
        format!("{}_{}_{}", self.namespace, MEDICATIONS_PREFIX, patient_id)
    }

    /// Keys that exist independently of any patient.
    pub fn fixed(&self) -> [String; 5] {
        [
            self.patients(),
            self.clinical_notes(),
            self.calendar_events(),
            self.metadata(),
            self.patient_sequence(),
        ]
    }
}
