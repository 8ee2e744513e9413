//! Dashboard counters derived from the stored collections.

use super::Repository;
use crate::records::{EventType, PatientStatus, StorageStats};
use crate::store::KeyValueStore;

impl<S: KeyValueStore> Repository<S> {
    /// Computes the dashboard counters from current storage. Nothing is cached.
    pub fn compute_stats(&self) -> StorageStats {
        let patients = self.read_patients();
        let count_status = |status: PatientStatus| {
            patients.iter().filter(|p| p.status == status).count()
        };

        StorageStats {
            total_patients: patients.len(),
            active_patients: patients.len() - count_status(PatientStatus::Inactive),
            total_notes: self.read_notes().len(),
            today_appointments: self
                .list_today_events()
                .iter()
                .filter(|e| e.event_type == EventType::Appointment)
                .count(),
            urgent_patients: count_status(PatientStatus::Urgent),
            last_updated: self.metadata().last_sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::events::today;
    use super::super::test_support::*;
    use crate::records::{EventType, NewCalendarEvent, PatientStatus, PatientUpdate};

    fn set_status(repo: &crate::Repository<crate::MemoryStore>, id: &str, status: PatientStatus) {
        repo.update_patient(
            id,
            PatientUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn test_stats_on_empty_store() {
        let stats = repo().compute_stats();
        assert_eq!(stats.total_patients, 0);
        assert_eq!(stats.active_patients, 0);
        assert_eq!(stats.today_appointments, 0);
    }

    #[test]
    fn test_stats_counts() {
        let repo = repo();
        let a = repo.create_patient(named("Ada Lovelace")).unwrap();
        let b = repo.create_patient(named("Grace Hopper")).unwrap();
        repo.create_patient(named("Alan Turing")).unwrap();
        set_status(&repo, &a.id, PatientStatus::Inactive);
        set_status(&repo, &b.id, PatientStatus::Urgent);

        repo.create_event(NewCalendarEvent::appointment(today(), Some("09:00")))
            .unwrap();
        let mut task = NewCalendarEvent::appointment(today(), None);
        task.event_type = EventType::Task;
        repo.create_event(task).unwrap();
        repo.create_event(NewCalendarEvent::appointment("2001-01-01", None))
            .unwrap();

        let stats = repo.compute_stats();
        assert_eq!(stats.total_patients, 3);
        assert_eq!(stats.active_patients, 2);
        assert_eq!(stats.urgent_patients, 1);
        assert_eq!(stats.today_appointments, 1);
        assert_eq!(stats.last_updated, repo.metadata().last_sync);
    }
}
