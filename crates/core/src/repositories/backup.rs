//! Whole-store export, import and clear.
//!
//! An export is a single pretty-printed JSON document:
//!
//! ```text
//! {
//!   "patients": [...],
//!   "clinicalNotes": [...],
//!   "calendarEvents": [...],
//!   "metadata": {...},
//!   "vitals": { "<patientId>": [...] },       // ExportScope::Full only
//!   "medications": { "<patientId>": [...] }   // ExportScope::Full only
//! }
//! ```
//!
//! The default scope leaves out the per-patient vitals and medications, so a default round trip
//! drops them. Import stores the collections it finds as raw JSON arrays; record shapes are not
//! checked beyond that. A collection holding a record that does not parse reads as empty, and
//! mutations refuse to rewrite it (`StoreError::Unreadable`) until it is cleared or replaced by
//! another import.

use super::Repository;
use crate::collection::SlotRead;
use crate::error::{StoreError, StoreResult};
use crate::records::{
    CalendarEvent, ClinicalNote, Patient, PatientMedication, PatientVital, StorageMetadata,
};
use crate::store::KeyValueStore;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Which collections an export includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportScope {
    /// Patients, notes, events and metadata.
    #[default]
    Core,
    /// Everything in `Core` plus every stored patient's vitals and medications.
    Full,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    patients: Vec<Patient>,
    clinical_notes: Vec<ClinicalNote>,
    calendar_events: Vec<CalendarEvent>,
    metadata: StorageMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    vitals: Option<BTreeMap<String, Vec<PatientVital>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    medications: Option<BTreeMap<String, Vec<PatientMedication>>>,
}

/// Record counts written by [`Repository::import_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub patients: usize,
    pub clinical_notes: usize,
    pub calendar_events: usize,
    pub vitals_slots: usize,
    pub medication_slots: usize,
}

impl<S: KeyValueStore> Repository<S> {
    /// Exports patients, notes, events and metadata.
    pub fn export_all(&self) -> StoreResult<String> {
        self.export_with(ExportScope::Core)
    }

    /// Exports the store as pretty-printed JSON.
    ///
    /// With `ExportScope::Full`, vitals and medications are gathered for every patient in the
    /// patient collection; slots belonging to ids not in that collection are not found.
    pub fn export_with(&self, scope: ExportScope) -> StoreResult<String> {
        let patients = self.read_patients();

        let (vitals, medications) = match scope {
            ExportScope::Core => (None, None),
            ExportScope::Full => {
                let vitals = patients
                    .iter()
                    .map(|p| (p.id.clone(), self.list_vitals(&p.id)))
                    .filter(|(_, list)| !list.is_empty())
                    .collect();
                let medications = patients
                    .iter()
                    .map(|p| (p.id.clone(), self.list_medications(&p.id)))
                    .filter(|(_, list)| !list.is_empty())
                    .collect();
                (Some(vitals), Some(medications))
            }
        };

        let snapshot = Snapshot {
            patients,
            clinical_notes: self.read_notes(),
            calendar_events: self.read_events(),
            metadata: self.metadata(),
            vitals,
            medications,
        };

        serde_json::to_string_pretty(&snapshot).map_err(|source| StoreError::Serialization {
            key: "export".into(),
            source,
        })
    }

    /// Replaces the store contents with an exported document.
    ///
    /// The document is checked before anything is touched: it must be a JSON object whose
    /// `patients`, `clinicalNotes` and `calendarEvents` members, when present, are arrays, and
    /// whose `vitals` and `medications` members, when present, map patient ids to arrays. Every
    /// per-patient slot the document names or implies must also be storable by the substrate.
    /// The store is then cleared, the members present are written, and metadata is refreshed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ImportFormat` if the document fails those checks (the store is left
    /// untouched), or any substrate error raised while clearing or writing.
    pub fn import_all(&self, json: &str) -> StoreResult<ImportSummary> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| StoreError::ImportFormat(format!("invalid JSON format: {}", e)))?;
        let doc = value.as_object().ok_or_else(|| {
            StoreError::ImportFormat("expected a JSON object at the top level".into())
        })?;

        let patients = array_member(doc, "patients")?;
        let notes = array_member(doc, "clinicalNotes")?;
        let events = array_member(doc, "calendarEvents")?;
        let vitals = slot_member(doc, "vitals")?;
        let medications = slot_member(doc, "medications")?;

        let slot_ids = patients
            .into_iter()
            .flatten()
            .filter_map(|p| p.get("id").and_then(Value::as_str))
            .chain(vitals.iter().flatten().map(|(id, _)| *id))
            .chain(medications.iter().flatten().map(|(id, _)| *id));
        for patient_id in slot_ids {
            self.check_slot_keys(patient_id).map_err(|e| {
                StoreError::ImportFormat(format!(
                    "patient id '{}' cannot be stored: {}",
                    patient_id, e
                ))
            })?;
        }

        let _guard = self.lock();
        self.clear_all_unlocked()?;

        let mut summary = ImportSummary::default();
        if let Some(list) = patients {
            self.collections().write(&self.keys().patients(), list)?;
            summary.patients = list.len();
        }
        if let Some(list) = notes {
            self.collections()
                .write(&self.keys().clinical_notes(), list)?;
            summary.clinical_notes = list.len();
        }
        if let Some(list) = events {
            self.collections()
                .write(&self.keys().calendar_events(), list)?;
            summary.calendar_events = list.len();
        }
        for (patient_id, list) in vitals.unwrap_or_default() {
            self.collections()
                .write(&self.keys().vitals(patient_id), list)?;
            summary.vitals_slots += 1;
        }
        for (patient_id, list) in medications.unwrap_or_default() {
            self.collections()
                .write(&self.keys().medications(patient_id), list)?;
            summary.medication_slots += 1;
        }
        self.refresh_metadata_locked()?;

        tracing::info!(
            "imported {} patients, {} notes, {} events",
            summary.patients,
            summary.clinical_notes,
            summary.calendar_events
        );
        Ok(summary)
    }

    /// Removes every fixed collection and the vitals and medications slots of every stored
    /// patient.
    pub fn clear_all(&self) -> StoreResult<()> {
        let _guard = self.lock();
        self.clear_all_unlocked()
    }

    /// Ids are collected without parsing whole records, so a collection holding a malformed
    /// record can still be cleared.
    fn clear_all_unlocked(&self) -> StoreResult<()> {
        for patient_id in self.stored_patient_ids() {
            if let Err(e) = self.check_slot_keys(&patient_id) {
                tracing::warn!("skipping slots of unstorable patient id {}: {}", patient_id, e);
                continue;
            }
            self.collections().remove(&self.keys().vitals(&patient_id))?;
            self.collections()
                .remove(&self.keys().medications(&patient_id))?;
        }
        for key in self.keys().fixed() {
            self.collections().remove(&key)?;
        }
        tracing::info!("cleared namespace {}", self.keys().namespace());
        Ok(())
    }
}

impl<S: KeyValueStore> Repository<S> {
    fn check_slot_keys(&self, patient_id: &str) -> StoreResult<()> {
        self.collections()
            .check_key(&self.keys().vitals(patient_id))?;
        self.collections()
            .check_key(&self.keys().medications(patient_id))
    }

    fn stored_patient_ids(&self) -> Vec<String> {
        match self.collections().read::<Vec<Value>>(&self.keys().patients()) {
            SlotRead::Loaded(list) => list
                .iter()
                .filter_map(|p| p.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            SlotRead::Missing => Vec::new(),
            SlotRead::Recovered { reason } => {
                tracing::warn!(
                    "patient collection is not a JSON array, per-patient slots are left behind: {}",
                    reason
                );
                Vec::new()
            }
        }
    }
}

fn array_member<'a>(
    doc: &'a Map<String, Value>,
    name: &str,
) -> StoreResult<Option<&'a Vec<Value>>> {
    match doc.get(name) {
        None => Ok(None),
        Some(Value::Array(list)) => Ok(Some(list)),
        Some(_) => Err(StoreError::ImportFormat(format!(
            "'{}' must be an array",
            name
        ))),
    }
}

fn slot_member<'a>(
    doc: &'a Map<String, Value>,
    name: &str,
) -> StoreResult<Option<Vec<(&'a str, &'a Vec<Value>)>>> {
    let Some(member) = doc.get(name) else {
        return Ok(None);
    };
    let Value::Object(slots) = member else {
        return Err(StoreError::ImportFormat(format!(
            "'{}' must map patient ids to arrays",
            name
        )));
    };

    slots
        .iter()
        .map(|(patient_id, list)| match list {
            Value::Array(list) => Ok((patient_id.as_str(), list)),
            _ => Err(StoreError::ImportFormat(format!(
                "'{}.{}' must be an array",
                name, patient_id
            ))),
        })
        .collect::<StoreResult<Vec<_>>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::records::{
        MedicationStatus, NewCalendarEvent, NewClinicalNote, NewPatientMedication,
        NewPatientVital,
    };
    use crate::store::{FileStore, MemoryStore};
    use tempfile::TempDir;

    fn file_repo(temp_dir: &TempDir) -> Repository<FileStore> {
        let store = FileStore::open(&temp_dir.path().join("store")).unwrap();
        Repository::new(test_cfg(), store)
    }

    fn patient_json(id: &str, sex: &str) -> Value {
        serde_json::json!({
            "id": id,
            "mrn": format!("MRN-2025-{id}-AB12C"),
            "name": "Imported Patient",
            "age": 40,
            "sex": sex,
            "status": "stable"
        })
    }

    fn populated() -> Repository<MemoryStore> {
        let repo = repo();
        let ada = repo.create_patient(named("Ada Lovelace")).unwrap();
        let grace = repo.create_patient(named("Grace Hopper")).unwrap();
        repo.create_note(NewClinicalNote::text(&ada.id, "first")).unwrap();
        repo.create_note(NewClinicalNote::text(&grace.id, "second")).unwrap();
        let mut event = NewCalendarEvent::appointment("2025-02-01", Some("10:00"));
        event.patient_id = Some(grace.id.clone());
        repo.create_event(event).unwrap();
        repo.add_vital(
            &ada.id,
            NewPatientVital {
                hr: Some(64),
                ..Default::default()
            },
        )
        .unwrap();
        repo.add_medication(
            &grace.id,
            NewPatientMedication {
                name: "Atorvastatin".into(),
                dosage: "20mg".into(),
                frequency: "Once daily".into(),
                start_date: "2025-01-01".into(),
                end_date: None,
                status: MedicationStatus::Active,
                notes: None,
            },
        )
        .unwrap();
        repo
    }

    fn sorted<T: Clone, K: Ord>(items: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
        let mut items = items.to_vec();
        items.sort_by_key(|i| key(i));
        items
    }

    #[test]
    fn test_export_layout() {
        let repo = populated();
        let doc: Value = serde_json::from_str(&repo.export_all().unwrap()).unwrap();

        assert_eq!(doc["patients"].as_array().unwrap().len(), 2);
        assert_eq!(doc["clinicalNotes"].as_array().unwrap().len(), 2);
        assert_eq!(doc["calendarEvents"].as_array().unwrap().len(), 1);
        assert_eq!(doc["metadata"]["patientCount"], 2);
        assert!(doc.get("vitals").is_none());
        assert!(doc.get("medications").is_none());
    }

    #[test]
    fn test_round_trip_restores_core_collections() {
        let repo = populated();
        let patients = repo.list_patients();
        let notes = repo.list_notes();
        let events = repo.list_events();
        let export = repo.export_all().unwrap();

        repo.create_patient(named("Alan Turing")).unwrap();
        repo.import_all(&export).unwrap();

        assert_eq!(
            sorted(&repo.list_patients(), |p| p.id.clone()),
            sorted(&patients, |p| p.id.clone())
        );
        assert_eq!(
            sorted(&repo.list_notes(), |n| n.id.clone()),
            sorted(&notes, |n| n.id.clone())
        );
        assert_eq!(repo.list_events(), events);
        // Per-patient lists are outside the default export scope.
        assert!(repo.list_vitals("001").is_empty());
        assert!(repo.list_medications("002").is_empty());
        assert_eq!(repo.metadata().patient_count, 2);
    }

    #[test]
    fn test_full_round_trip_keeps_vitals_and_medications() {
        let source = populated();
        let vitals = source.list_vitals("001");
        let meds = source.list_medications("002");
        let export = source.export_with(ExportScope::Full).unwrap();

        let restored = repo();
        let summary = restored.import_all(&export).unwrap();

        assert_eq!(summary.patients, 2);
        assert_eq!(summary.vitals_slots, 1);
        assert_eq!(summary.medication_slots, 1);
        assert_eq!(restored.list_vitals("001"), vitals);
        assert_eq!(restored.list_medications("002"), meds);
    }

    #[test]
    fn test_invalid_json_leaves_store_untouched() {
        let repo = populated();
        let before = repo.export_with(ExportScope::Full).unwrap();

        let err = repo.import_all("{ not json").unwrap_err();
        assert!(matches!(err, StoreError::ImportFormat(ref m) if m.starts_with("invalid JSON format")));

        for bad in ["[]", "42", r#"{"patients": {}}"#, r#"{"vitals": {"001": 5}}"#] {
            assert!(matches!(
                repo.import_all(bad),
                Err(StoreError::ImportFormat(_))
            ));
        }

        assert_eq!(repo.list_patients().len(), 2);
        assert_eq!(repo.list_vitals("001").len(), 1);
        let after = repo.export_with(ExportScope::Full).unwrap();
        let strip = |s: &str| {
            let mut v: Value = serde_json::from_str(s).unwrap();
            v.as_object_mut().unwrap().remove("metadata");
            v
        };
        assert_eq!(strip(&before), strip(&after));
    }

    #[test]
    fn test_partial_document_clears_missing_collections() {
        let repo = populated();
        repo.import_all(r#"{"patients": []}"#).unwrap();

        assert!(repo.list_patients().is_empty());
        assert!(repo.list_notes().is_empty());
        assert!(repo.list_events().is_empty());
        assert!(!repo.store().contains(&repo.keys().vitals("001")).unwrap());
    }

    #[test]
    fn test_import_stores_unchecked_records() {
        let repo = repo();
        repo.import_all(r#"{"patients": [{"unexpected": true}]}"#)
            .unwrap();

        let raw = repo.store().get(&repo.keys().patients()).unwrap();
        assert_eq!(raw.as_deref(), Some(r#"[{"unexpected":true}]"#));
        assert!(repo.list_patients().is_empty());
    }

    #[test]
    fn test_clear_all_removes_every_slot() {
        let repo = populated();
        repo.clear_all().unwrap();

        for key in repo.keys().fixed() {
            assert!(!repo.store().contains(&key).unwrap(), "{key} still present");
        }
        assert!(!repo.store().contains(&repo.keys().vitals("001")).unwrap());
        assert!(!repo
            .store()
            .contains(&repo.keys().medications("002"))
            .unwrap());
        assert!(repo.store().keys().is_empty());
    }

    #[test]
    fn test_opaque_patient_ids_survive_file_store_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = file_repo(&temp_dir);
        let doc = serde_json::json!({
            "patients": [patient_json("p 1", "F"), patient_json("../x", "M")],
            "vitals": {
                "p 1": [{ "id": "vital-1-abcdef", "date": "2025-01-01T08:00:00Z", "hr": 70 }]
            },
            "medications": { "../x": [] }
        })
        .to_string();

        let summary = repo.import_all(&doc).unwrap();
        assert_eq!(summary.patients, 2);
        assert_eq!(summary.vitals_slots, 1);
        assert_eq!(repo.list_vitals("p 1").len(), 1);

        // The traversal-looking id stays a file inside the store directory.
        let beside: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().flatten().collect();
        assert_eq!(beside.len(), 1);

        repo.delete_patient("p 1").unwrap();
        assert_eq!(repo.list_patients().len(), 1);
        assert!(repo.list_vitals("p 1").is_empty());

        repo.import_all(&doc).unwrap();
        repo.clear_all().unwrap();
        assert!(repo.list_patients().is_empty());
        let leftover: Vec<_> = std::fs::read_dir(temp_dir.path().join("store"))
            .unwrap()
            .flatten()
            .collect();
        assert!(leftover.is_empty(), "left behind: {leftover:?}");
    }

    #[test]
    fn test_unstorable_slot_rejected_before_clearing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = file_repo(&temp_dir);
        let ada = repo.create_patient(ada()).unwrap();
        repo.create_note(NewClinicalNote::text(&ada.id, "kept")).unwrap();

        let long_id = "/".repeat(100);
        let bad_vitals = serde_json::json!({
            "patients": [],
            "vitals": { long_id.as_str(): [] }
        })
        .to_string();
        let bad_patient = serde_json::json!({
            "patients": [patient_json(&long_id, "F")]
        })
        .to_string();

        for doc in [bad_vitals, bad_patient] {
            let err = repo.import_all(&doc).unwrap_err();
            assert!(matches!(err, StoreError::ImportFormat(ref m) if m.contains("cannot be stored")));
        }

        assert_eq!(repo.list_patients(), vec![ada]);
        assert_eq!(repo.list_notes().len(), 1);
    }

    #[test]
    fn test_malformed_import_blocks_writes_until_replaced() {
        let repo = repo();
        let doc = serde_json::json!({
            "patients": [patient_json("001", "F"), patient_json("002", "male")]
        })
        .to_string();
        repo.import_all(&doc).unwrap();
        let raw = repo.store().get(&repo.keys().patients()).unwrap();

        // Reads fall back to empty, but nothing is allowed to overwrite the stored records.
        assert!(repo.list_patients().is_empty());
        for err in [
            repo.create_patient(ada()).unwrap_err(),
            repo.update_patient("001", Default::default()).unwrap_err(),
            repo.delete_patient("001").unwrap_err(),
        ] {
            assert!(matches!(err, StoreError::Unreadable { ref key, .. } if *key == repo.keys().patients()));
        }
        assert_eq!(repo.store().get(&repo.keys().patients()).unwrap(), raw);

        repo.clear_all().unwrap();
        assert_eq!(repo.create_patient(ada()).unwrap().id, "001");
    }

    #[test]
    fn test_malformed_notes_block_note_writes() {
        let repo = populated();
        repo.store()
            .set(&repo.keys().clinical_notes(), r#"[{"id": 7}]"#)
            .unwrap();

        let err = repo
            .create_note(NewClinicalNote::text("001", "lost?"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unreadable { .. }));
        assert_eq!(
            repo.store()
                .get(&repo.keys().clinical_notes())
                .unwrap()
                .as_deref(),
            Some(r#"[{"id": 7}]"#)
        );
    }
}
