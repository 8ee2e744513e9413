//! Per-patient medication lists.

use super::{allocate_record_id, Repository};
use crate::error::{RecordType, StoreError, StoreResult};
use crate::records::{MedicationStatus, NewPatientMedication, PatientMedication};
use crate::store::KeyValueStore;
use mediq_ids::RecordKind;

impl<S: KeyValueStore> Repository<S> {
    pub fn list_medications(&self, patient_id: &str) -> Vec<PatientMedication> {
        self.collections()
            .read_collection(&self.keys().medications(patient_id))
    }

    /// Medications whose status is `active`.
    pub fn list_active_medications(&self, patient_id: &str) -> Vec<PatientMedication> {
        self.list_medications(patient_id)
            .into_iter()
            .filter(|m| m.status == MedicationStatus::Active)
            .collect()
    }

    /// Appends a medication to the patient's list.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the patient does not exist, or
    /// `StoreError::InvalidInput` if the medication name is blank.
    pub fn add_medication(
        &self,
        patient_id: &str,
        medication: NewPatientMedication,
    ) -> StoreResult<PatientMedication> {
        medication.validate()?;
        let _guard = self.lock();

        if !self.patient_exists(patient_id) {
            return Err(StoreError::not_found(RecordType::Patient, patient_id));
        }

        let key = self.keys().medications(patient_id);
        let mut medications: Vec<PatientMedication> =
            self.collections().read_for_update(&key)?;
        let id = allocate_record_id(RecordKind::Medication, |c| {
            medications.iter().any(|m| m.id == c)
        })?;
        let medication = medication.into_medication(id);
        medications.push(medication.clone());

        self.collections().write(&key, &medications)?;
        self.refresh_metadata_locked()?;

        tracing::info!("added medication {} for patient {}", medication.id, patient_id);
        Ok(medication)
    }
}
