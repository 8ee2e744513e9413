//! Storage metadata snapshot.

use super::Repository;
use crate::constants::STORAGE_VERSION;
use crate::error::StoreResult;
use crate::records::StorageMetadata;
use crate::store::KeyValueStore;
use chrono::Utc;

impl<S: KeyValueStore> Repository<S> {
    /// Returns the stored snapshot, or an empty one stamped now when none is readable.
    pub fn metadata(&self) -> StorageMetadata {
        self.collections().read_or_default(&self.keys().metadata())
    }

    /// Recounts every collection and stores a fresh snapshot.
    ///
    /// Mutating operations call this as their final step; it is public for callers that write
    /// to the store directly.
    pub fn refresh_metadata(&self) -> StoreResult<StorageMetadata> {
        let _guard = self.lock();
        self.refresh_metadata_locked()
    }

    /// Body of [`Self::refresh_metadata`] for callers already holding the write lock.
    pub(crate) fn refresh_metadata_locked(&self) -> StoreResult<StorageMetadata> {
        let metadata = StorageMetadata {
            version: STORAGE_VERSION.to_string(),
            last_sync: Utc::now(),
            patient_count: self.read_patients().len(),
            note_count: self.read_notes().len(),
            event_count: self.read_events().len(),
        };
        self.collections()
            .write(&self.keys().metadata(), &metadata)?;
        tracing::debug!(
            "metadata refreshed: {} patients, {} notes, {} events",
            metadata.patient_count,
            metadata.note_count,
            metadata.event_count
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::records::NewClinicalNote;
    use crate::store::KeyValueStore;

    #[test]
    fn test_default_metadata_when_absent_or_corrupt() {
        let repo = repo();
        let meta = repo.metadata();
        assert_eq!(meta.version, "1.0.0");
        assert_eq!(meta.patient_count, 0);

        repo.store().set(&repo.keys().metadata(), "[1,2").unwrap();
        assert_eq!(repo.metadata().note_count, 0);
    }

    #[test]
    fn test_counts_track_mutations() {
        let repo = repo();
        let patient = repo.create_patient(ada()).unwrap();
        let first = repo.metadata();
        assert_eq!(first.patient_count, 1);

        repo.create_note(NewClinicalNote::text(&patient.id, "ok"))
            .unwrap();
        let second = repo.metadata();
        assert_eq!(second.note_count, 1);
        assert!(second.last_sync >= first.last_sync);
    }

    #[test]
    fn test_refresh_picks_up_direct_writes() {
        let repo = repo();
        repo.store()
            .set(&repo.keys().calendar_events(), "[]")
            .unwrap();
        let meta = repo.refresh_metadata().unwrap();
        assert_eq!(meta.event_count, 0);
        assert_eq!(repo.metadata(), meta);
    }
}
