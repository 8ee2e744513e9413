//! Demo data for a fresh store.

use super::events::today;
use super::Repository;
use crate::collection::SlotRead;
use crate::error::StoreResult;
use crate::records::{
    CreatePatientRequest, EventStatus, EventType, NewCalendarEvent, NewClinicalNote, NoteType,
    Patient, Sex,
};
use crate::store::KeyValueStore;
use chrono::{Duration, Utc};

impl<S: KeyValueStore> Repository<S> {
    /// Seeds five patients, two notes and three appointments (two today, one tomorrow).
    ///
    /// Does nothing unless sample data is enabled in the configuration and the patient
    /// collection is empty. An unreadable patient collection is left alone.
    ///
    /// # Returns
    ///
    /// `true` if the sample records were written.
    pub fn initialise_sample_data(&self) -> StoreResult<bool> {
        if !self.config().sample_data_enabled() {
            tracing::info!("sample data disabled, skipping seed");
            return Ok(false);
        }
        match self.collections().read::<Vec<Patient>>(&self.keys().patients()) {
            SlotRead::Missing => {}
            SlotRead::Loaded(patients) if patients.is_empty() => {}
            SlotRead::Loaded(_) => {
                tracing::info!("store already holds patients, skipping seed");
                return Ok(false);
            }
            SlotRead::Recovered { reason } => {
                tracing::warn!("patient collection is unreadable, skipping seed: {}", reason);
                return Ok(false);
            }
        }

        let patients = sample_patients()
            .into_iter()
            .map(|request| self.create_patient(request))
            .collect::<StoreResult<Vec<Patient>>>()?;

        let now = Utc::now();
        let notes = [
            NewClinicalNote {
                patient_id: patients[0].id.clone(),
                date: now,
                note_type: NoteType::Text,
                content: "Patient showing improvement in blood pressure control".into(),
                transcript: None,
                insights: Some(vec![
                    "Good compliance with medication".into(),
                    "Continue current regimen".into(),
                ]),
                actions: Some(vec!["Schedule follow-up in 1 month".into()]),
            },
            NewClinicalNote {
                patient_id: patients[1].id.clone(),
                date: now,
                note_type: NoteType::Voice,
                content: "Routine checkup, vitals stable".into(),
                transcript: Some("Routine checkup, vitals stable".into()),
                insights: Some(vec!["All values within normal range".into()]),
                actions: Some(vec!["Continue annual preventive care".into()]),
            },
        ];
        for note in notes {
            self.create_note(note)?;
        }

        let tomorrow = (now + Duration::days(1))
            .date_naive()
            .format("%Y-%m-%d")
            .to_string();
        let events = [
            (&patients[0], today(), "09:00", "Follow-up Consultation", EventStatus::Completed),
            (&patients[1], today(), "14:00", "Annual Physical", EventStatus::Scheduled),
            (&patients[2], tomorrow, "10:00", "Lab Results Review", EventStatus::Scheduled),
        ];
        for (patient, date, time, title, status) in events {
            self.create_event(NewCalendarEvent {
                date,
                time: Some(time.into()),
                patient_id: Some(patient.id.clone()),
                patient_name: Some(patient.name.clone()),
                event_type: EventType::Appointment,
                title: Some(title.into()),
                notes: None,
                status,
            })?;
        }

        tracing::info!("sample data initialised");
        Ok(true)
    }
}

fn sample_patients() -> Vec<CreatePatientRequest> {
    [
        ("John Doe", 45, Sex::Male, "555-0001", "New York"),
        ("Sarah Johnson", 38, Sex::Female, "555-0002", "Boston"),
        ("Michael Chen", 52, Sex::Male, "555-0003", "San Francisco"),
        ("Emily Davis", 29, Sex::Female, "555-0004", "Austin"),
        ("Robert Wilson", 67, Sex::Male, "555-0005", "Chicago"),
    ]
    .into_iter()
    .map(|(name, age, sex, phone, city)| CreatePatientRequest {
        name: name.into(),
        age,
        sex,
        phone: Some(phone.into()),
        city: Some(city.into()),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::config::CoreConfig;
    use crate::store::MemoryStore;
    use crate::Repository;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn seeding_repo() -> Repository<MemoryStore> {
        let cfg = CoreConfig::new(PathBuf::from("unused"), "mediq")
            .unwrap()
            .with_sample_data(true);
        Repository::new(Arc::new(cfg), MemoryStore::new())
    }

    #[test]
    fn test_disabled_by_default() {
        let repo = repo();
        assert!(!repo.initialise_sample_data().unwrap());
        assert!(repo.list_patients().is_empty());
    }

    #[test]
    fn test_seeds_empty_store() {
        let repo = seeding_repo();
        assert!(repo.initialise_sample_data().unwrap());

        assert_eq!(repo.list_patients().len(), 5);
        assert_eq!(repo.list_notes().len(), 2);
        assert_eq!(repo.list_events().len(), 3);
        assert_eq!(repo.list_today_events().len(), 2);

        let meta = repo.metadata();
        assert_eq!((meta.patient_count, meta.note_count, meta.event_count), (5, 2, 3));
    }

    #[test]
    fn test_does_not_reseed() {
        let repo = seeding_repo();
        repo.create_patient(ada()).unwrap();
        assert!(!repo.initialise_sample_data().unwrap());
        assert_eq!(repo.list_patients().len(), 1);
    }

    #[test]
    fn test_unreadable_patients_are_not_reseeded() {
        use crate::store::KeyValueStore;

        let repo = seeding_repo();
        let key = repo.keys().patients();
        repo.store().set(&key, "[{\"id\":").unwrap();

        assert!(!repo.initialise_sample_data().unwrap());
        assert_eq!(repo.store().get(&key).unwrap().as_deref(), Some("[{\"id\":"));
        assert!(repo.list_notes().is_empty());
    }
}
