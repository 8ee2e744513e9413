//! Clinical note operations.

use super::{allocate_record_id, Repository};
use crate::error::{RecordType, StoreError, StoreResult};
use crate::records::{ClinicalNote, ClinicalNoteUpdate, NewClinicalNote};
use crate::store::KeyValueStore;
use chrono::Utc;
use mediq_ids::RecordKind;

impl<S: KeyValueStore> Repository<S> {
    pub fn list_notes(&self) -> Vec<ClinicalNote> {
        self.read_notes()
    }

    pub fn list_notes_by_patient(&self, patient_id: &str) -> Vec<ClinicalNote> {
        self.read_notes()
            .into_iter()
            .filter(|n| n.patient_id == patient_id)
            .collect()
    }

    pub fn get_note(&self, id: &str) -> Option<ClinicalNote> {
        self.read_notes().into_iter().find(|n| n.id == id)
    }

    /// Stores a new note with a generated `note-<millis>-<suffix>` id and `createdAt = now`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if `note.patient_id` does not name a stored patient, or any
    /// substrate error from the write.
    pub fn create_note(&self, note: NewClinicalNote) -> StoreResult<ClinicalNote> {
        note.validate()?;
        let _guard = self.lock();

        if !self.patient_exists(&note.patient_id) {
            return Err(StoreError::not_found(RecordType::Patient, &note.patient_id));
        }

        let mut notes = self.load_notes()?;
        let id = allocate_record_id(RecordKind::Note, |c| notes.iter().any(|n| n.id == c))?;
        let note = note.into_note(id, Utc::now());
        notes.push(note.clone());

        self.collections()
            .write(&self.keys().clinical_notes(), &notes)?;
        self.refresh_metadata_locked()?;

        tracing::info!("created note {} for patient {}", note.id, note.patient_id);
        Ok(note)
    }

    /// Merges `update` over the stored note and stamps `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no note has `id`.
    pub fn update_note(&self, id: &str, update: ClinicalNoteUpdate) -> StoreResult<ClinicalNote> {
        let _guard = self.lock();

        let mut notes = self.load_notes()?;
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::not_found(RecordType::ClinicalNote, id))?;
        update.apply(note, Utc::now());
        let updated = note.clone();

        self.collections()
            .write(&self.keys().clinical_notes(), &notes)?;
        self.refresh_metadata_locked()?;
        Ok(updated)
    }

    /// Removes a note. Removing an unknown id is a no-op.
    pub fn delete_note(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock();

        let mut notes = self.load_notes()?;
        notes.retain(|n| n.id != id);
        self.collections()
            .write(&self.keys().clinical_notes(), &notes)?;
        self.refresh_metadata_locked()?;
        Ok(())
    }
}
