use super::{merge, merge_opt};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

string_enum! {
    /// How the note was captured.
    NoteType, "note type" {
        Text => "text",
        Voice => "voice",
        Prescription => "prescription",
    }
}

/// A clinical note attached to a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNote {
    pub id: String,
    pub patient_id: String,
    /// When the clinical encounter took place.
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A note as supplied by the caller; `id` and `createdAt` are assigned on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewClinicalNote {
    pub patient_id: String,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

impl NewClinicalNote {
    /// A text note dated now.
    pub fn text(patient_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            date: Utc::now(),
            note_type: NoteType::Text,
            content: content.into(),
            transcript: None,
            insights: None,
            actions: None,
        }
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        if self.patient_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("note patientId cannot be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn into_note(self, id: String, created_at: DateTime<Utc>) -> ClinicalNote {
        ClinicalNote {
            id,
            patient_id: self.patient_id,
            date: self.date,
            note_type: self.note_type,
            content: self.content,
            transcript: self.transcript,
            insights: self.insights,
            actions: self.actions,
            created_at,
            updated_at: None,
        }
    }
}

/// Partial note update. `id`, `patientId` and `createdAt` are fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNoteUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub note_type: Option<NoteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

impl ClinicalNoteUpdate {
    /// Shallow-merges the present fields over `note` and stamps `updatedAt`.
    pub(crate) fn apply(self, note: &mut ClinicalNote, now: DateTime<Utc>) {
        merge(&mut note.date, self.date);
        merge(&mut note.note_type, self.note_type);
        merge(&mut note.content, self.content);
        merge_opt(&mut note.transcript, self.transcript);
        merge_opt(&mut note.insights, self.insights);
        merge_opt(&mut note.actions, self.actions);
        note.updated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_field_is_named_type() {
        let note = NewClinicalNote::text("001", "ok").into_note("note-1-abc".into(), Utc::now());
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["patientId"], "001");
        assert!(value.get("updatedAt").is_none());
        assert!(value.get("insights").is_none());
    }

    #[test]
    fn test_new_note_date_defaults_to_now() {
        let note: NewClinicalNote =
            serde_json::from_str(r#"{"patientId":"001","type":"voice","content":"hi"}"#).unwrap();
        assert_eq!(note.note_type, NoteType::Voice);
        assert!((Utc::now() - note.date).num_seconds() < 5);
    }

    #[test]
    fn test_update_always_stamps_updated_at() {
        let mut note = NewClinicalNote::text("001", "ok").into_note("note-1-abc".into(), Utc::now());
        let now = Utc::now();
        ClinicalNoteUpdate::default().apply(&mut note, now);
        assert_eq!(note.updated_at, Some(now));
        assert_eq!(note.content, "ok");

        ClinicalNoteUpdate {
            insights: Some(vec!["Stable".into()]),
            ..Default::default()
        }
        .apply(&mut note, now);
        assert_eq!(note.insights.as_deref(), Some(&["Stable".to_string()][..]));
    }

    #[test]
    fn test_blank_patient_id_is_rejected() {
        assert!(NewClinicalNote::text("  ", "ok").validate().is_err());
    }
}
