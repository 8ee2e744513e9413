//! Per-patient vital sign lists.

use super::{allocate_record_id, Repository};
use crate::error::{RecordType, StoreError, StoreResult};
use crate::records::{NewPatientVital, PatientVital};
use crate::store::KeyValueStore;
use chrono::Utc;
use mediq_ids::RecordKind;

impl<S: KeyValueStore> Repository<S> {
    pub fn list_vitals(&self, patient_id: &str) -> Vec<PatientVital> {
        self.collections()
            .read_collection(&self.keys().vitals(patient_id))
    }

    /// Appends a vital reading to the patient's list.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the patient does not exist, so no orphan slot is created.
    pub fn add_vital(&self, patient_id: &str, vital: NewPatientVital) -> StoreResult<PatientVital> {
        let _guard = self.lock();

        if !self.patient_exists(patient_id) {
            return Err(StoreError::not_found(RecordType::Patient, patient_id));
        }

        let key = self.keys().vitals(patient_id);
        let mut vitals: Vec<PatientVital> = self.collections().read_for_update(&key)?;
        let id = allocate_record_id(RecordKind::Vital, |c| vitals.iter().any(|v| v.id == c))?;
        let vital = vital.into_vital(id, Utc::now());
        vitals.push(vital.clone());

        self.collections().write(&key, &vitals)?;
        self.refresh_metadata_locked()?;
        Ok(vital)
    }
}
