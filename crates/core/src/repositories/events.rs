//! Calendar event operations.
//!
//! Event dates are `YYYY-MM-DD` strings and date queries are exact string matches. Today is the
//! current UTC date.

use super::{allocate_record_id, Repository};
use crate::config::StatusTransitions;
use crate::error::{RecordType, StoreError, StoreResult};
use crate::records::{CalendarEvent, CalendarEventUpdate, NewCalendarEvent};
use crate::store::KeyValueStore;
use chrono::Utc;
use mediq_ids::RecordKind;
use std::collections::HashMap;

impl<S: KeyValueStore> Repository<S> {
    /// Returns every event as stored, including the cached `patientName`.
    pub fn list_events(&self) -> Vec<CalendarEvent> {
        self.read_events()
    }

    pub fn get_event(&self, id: &str) -> Option<CalendarEvent> {
        self.read_events().into_iter().find(|e| e.id == id)
    }

    /// Events whose `date` equals `date` exactly. `2025-01` does not match `2025-01-05`.
    pub fn list_events_by_date(&self, date: &str) -> Vec<CalendarEvent> {
        self.read_events()
            .into_iter()
            .filter(|e| e.date == date)
            .collect()
    }

    pub fn list_today_events(&self) -> Vec<CalendarEvent> {
        self.list_events_by_date(&today())
    }

    /// Returns every event with `patientName` taken from the current patient collection.
    ///
    /// Events whose patient no longer exists keep their cached name. Nothing is written back.
    pub fn list_events_resolved(&self) -> Vec<CalendarEvent> {
        let names: HashMap<String, String> = self
            .read_patients()
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        self.read_events()
            .into_iter()
            .map(|mut event| {
                if let Some(name) = event.patient_id.as_ref().and_then(|id| names.get(id)) {
                    event.patient_name = Some(name.clone());
                }
                event
            })
            .collect()
    }

    /// Stores a new event with a generated `event-<millis>-<suffix>` id.
    ///
    /// When the event names a stored patient but carries no `patientName`, the name is filled in
    /// from the patient record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` for a malformed date or time, or any substrate error.
    pub fn create_event(&self, mut event: NewCalendarEvent) -> StoreResult<CalendarEvent> {
        event.validate()?;
        let _guard = self.lock();

        if event.patient_name.is_none() {
            if let Some(patient_id) = &event.patient_id {
                event.patient_name = self
                    .read_patients()
                    .into_iter()
                    .find(|p| &p.id == patient_id)
                    .map(|p| p.name);
            }
        }

        let mut events = self.load_events()?;
        let id = allocate_record_id(RecordKind::Event, |c| events.iter().any(|e| e.id == c))?;
        let event = event.into_event(id, Utc::now());
        events.push(event.clone());

        self.collections()
            .write(&self.keys().calendar_events(), &events)?;
        self.refresh_metadata_locked()?;

        tracing::info!("created {} {} on {}", event.event_type, event.id, event.date);
        Ok(event)
    }

    /// Merges `update` over the stored event.
    ///
    /// With `StatusTransitions::Enforced` configured, a status change outside the transition
    /// table is rejected before anything is written.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `StoreError::NotFound` if no event has `id`,
    /// - `StoreError::InvalidTransition` for a rejected status change,
    /// - `StoreError::InvalidInput` for a malformed date or time.
    pub fn update_event(
        &self,
        id: &str,
        update: CalendarEventUpdate,
    ) -> StoreResult<CalendarEvent> {
        update.validate()?;
        let _guard = self.lock();

        let mut events = self.load_events()?;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::not_found(RecordType::CalendarEvent, id))?;

        if let Some(next) = update.status {
            if self.config().status_transitions() == StatusTransitions::Enforced
                && !event.status.can_transition_to(next)
            {
                return Err(StoreError::InvalidTransition {
                    from: event.status.to_string(),
                    to: next.to_string(),
                });
            }
        }

        update.apply(event);
        let updated = event.clone();

        self.collections()
            .write(&self.keys().calendar_events(), &events)?;
        self.refresh_metadata_locked()?;
        Ok(updated)
    }

    /// Removes an event. Removing an unknown id is a no-op.
    pub fn delete_event(&self, id: &str) -> StoreResult<()> {
        let _guard = self.lock();

        let mut events = self.load_events()?;
        events.retain(|e| e.id != id);
        self.collections()
            .write(&self.keys().calendar_events(), &events)?;
        self.refresh_metadata_locked()?;
        Ok(())
    }
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}
