use super::{merge, merge_opt};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    EventType, "event type" {
        Appointment => "appointment",
        Task => "task",
        Reminder => "reminder",
    }
}

string_enum! {
    EventStatus, "event status" {
        Scheduled => "scheduled",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Scheduled
    }
}

impl EventStatus {
    /// Whether the transition table allows moving from `self` to `next`.
    ///
    /// Only consulted when `StatusTransitions::Enforced` is configured. Completed events are final;
    /// cancelled events may be rescheduled.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;
        matches!(
            (self, next),
            (Scheduled, _) | (Completed, Completed) | (Cancelled, Cancelled | Scheduled)
        )
    }
}

/// An appointment, task or reminder on the clinic calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    /// Calendar day as `YYYY-MM-DD`.
    pub date: String,
    /// Start time as `HH:mm`; absent for all-day items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    /// Display name cached when the event was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewCalendarEvent {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
}

impl NewCalendarEvent {
    /// A scheduled appointment with no patient attached.
    pub fn appointment(date: impl Into<String>, time: Option<&str>) -> Self {
        Self {
            date: date.into(),
            time: time.map(str::to_string),
            patient_id: None,
            patient_name: None,
            event_type: EventType::Appointment,
            title: None,
            notes: None,
            status: EventStatus::Scheduled,
        }
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        validate_date(&self.date)?;
        if let Some(time) = &self.time {
            validate_time(time)?;
        }
        Ok(())
    }

    pub(crate) fn into_event(self, id: String, created_at: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id,
            date: self.date,
            time: self.time,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            event_type: self.event_type,
            title: self.title,
            notes: self.notes,
            status: self.status,
            created_at,
        }
    }
}

/// Partial event update. `id` and `createdAt` are fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

impl CalendarEventUpdate {
    /// A status-only update.
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        if let Some(date) = &self.date {
            validate_date(date)?;
        }
        if let Some(time) = &self.time {
            validate_time(time)?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, event: &mut CalendarEvent) {
        merge(&mut event.date, self.date);
        merge_opt(&mut event.time, self.time);
        merge_opt(&mut event.patient_id, self.patient_id);
        merge_opt(&mut event.patient_name, self.patient_name);
        merge(&mut event.event_type, self.event_type);
        merge_opt(&mut event.title, self.title);
        merge_opt(&mut event.notes, self.notes);
        merge(&mut event.status, self.status);
    }
}

fn validate_date(date: &str) -> StoreResult<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| StoreError::InvalidInput(format!("event date '{}' is not YYYY-MM-DD", date)))
}

fn validate_time(time: &str) -> StoreResult<()> {
    if time.len() != 5 {
        return Err(StoreError::InvalidInput(format!(
            "event time '{}' is not HH:mm",
            time
        )));
    }
    NaiveTime::parse_from_str(time, "%H:%M")
        .map(|_| ())
        .map_err(|_| StoreError::InvalidInput(format!("event time '{}' is not HH:mm", time)))
}
