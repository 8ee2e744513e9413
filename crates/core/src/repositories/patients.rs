//! Patient operations.
//!
//! Patient ids are zero-padded sequence numbers (`001`, `002`, ...). The last issued sequence is
//! persisted separately from the patient collection, so an id freed by a deletion is never
//! handed out again.

use super::{allocate_with, Repository};
use crate::error::{RecordType, StoreError, StoreResult};
use crate::records::{CreatePatientRequest, Patient, PatientStatus, PatientUpdate};
use crate::store::KeyValueStore;
use chrono::Utc;
use mediq_ids::{Mrn, PatientId};

impl<S: KeyValueStore> Repository<S> {
    /// Returns every stored patient in insertion order.
    pub fn list_patients(&self) -> Vec<Patient> {
        self.read_patients()
    }

    /// Looks up a patient by id.
    pub fn get_patient(&self, id: &str) -> Option<Patient> {
        self.read_patients().into_iter().find(|p| p.id == id)
    }

    /// Registers a new patient.
    ///
    /// Assigns the next sequence id, a fresh MRN, `status = new` and `lastVisit = now`.
    ///
    /// # Arguments
    ///
    /// * `request` - Registration details; validated before anything is written
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `StoreError::InvalidInput` if the request breaks a registration rule,
    /// - `StoreError::IdAllocation` if no unused MRN could be generated,
    /// - `StoreError::Unreadable` if the stored patients or sequence cannot be parsed,
    /// - any substrate error from writing the collection (for example `QuotaExceeded`).
    pub fn create_patient(&self, request: CreatePatientRequest) -> StoreResult<Patient> {
        let request = request.validate()?;
        let _guard = self.lock();

        let mut patients = self.load_patients()?;
        let id = self.next_patient_id(&patients)?;
        let now = Utc::now();
        let mrn = allocate_with(
            || Mrn::generate(now, &id).to_string(),
            |candidate| patients.iter().any(|p| p.mrn == candidate),
            "MRN",
        )?;

        let patient = Patient {
            id: id.to_string(),
            mrn,
            name: request.name,
            age: request.age,
            sex: request.sex,
            phone: request.phone,
            city: request.city,
            status: PatientStatus::New,
            last_visit: Some(now),
        };

        patients.push(patient.clone());
        self.collections()
            .write(&self.keys().patients(), &patients)?;
        self.collections()
            .write(&self.keys().patient_sequence(), &id.sequence())?;
        self.refresh_metadata_locked()?;

        tracing::info!("created patient {} ({})", patient.id, patient.mrn);
        Ok(patient)
    }

    /// Shallow-merges `update` over the stored patient.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no patient has `id` (the stored collection is left
    /// untouched), or `StoreError::InvalidInput` if a supplied field breaks a registration rule.
    pub fn update_patient(&self, id: &str, update: PatientUpdate) -> StoreResult<Patient> {
        update.validate()?;
        let _guard = self.lock();

        let mut patients = self.load_patients()?;
        let patient = patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found(RecordType::Patient, id))?;
        update.apply(patient);
        let updated = patient.clone();

        self.collections()
            .write(&self.keys().patients(), &patients)?;
        self.refresh_metadata_locked()?;
        Ok(updated)
    }

    /// Deletes a patient and everything that references it.
    ///
    /// Cascade order: the patient record, the patient's notes, the patient's events, the vitals
    /// slot, the medications slot, then the metadata refresh. Every collection is read and every
    /// slot key is checked before the first write, so bad input or an unreadable collection
    /// fails with nothing changed. There is no transaction beyond that: a substrate failure part
    /// way through leaves the earlier steps applied. Deleting an unknown id still sweeps the
    /// dependent collections and succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unreadable` if a collection it must rewrite cannot be parsed, or any
    /// substrate error raised while checking, writing or removing a slot.
    pub fn delete_patient(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock();

        let vitals_key = self.keys().vitals(id);
        let medications_key = self.keys().medications(id);
        self.collections().check_key(&vitals_key)?;
        self.collections().check_key(&medications_key)?;

        let mut patients = self.load_patients()?;
        let mut notes = self.load_notes()?;
        let mut events = self.load_events()?;

        let before = patients.len();
        patients.retain(|p| p.id != id);
        let removed = before != patients.len();
        notes.retain(|n| n.patient_id != id);
        events.retain(|e| e.patient_id.as_deref() != Some(id));

        self.collections()
            .write(&self.keys().patients(), &patients)?;
        self.collections()
            .write(&self.keys().clinical_notes(), &notes)?;
        self.collections()
            .write(&self.keys().calendar_events(), &events)?;
        self.collections().remove(&vitals_key)?;
        self.collections().remove(&medications_key)?;
        self.refresh_metadata_locked()?;

        if removed {
            tracing::info!("deleted patient {} and dependent records", id);
        } else {
            tracing::debug!("delete requested for unknown patient {}", id);
        }
        Ok(())
    }

    /// Next id: one past the larger of the persisted sequence and the highest numeric id on
    /// file. The second term covers collections imported without a sequence.
    fn next_patient_id(&self, patients: &[Patient]) -> StoreResult<PatientId> {
        let persisted: u32 = self
            .collections()
            .read_for_update(&self.keys().patient_sequence())?;
        let highest = patients
            .iter()
            .filter_map(|p| PatientId::sequence_of(&p.id))
            .max()
            .unwrap_or(0);
        Ok(PatientId::next_after(persisted.max(highest))?)
    }
}
