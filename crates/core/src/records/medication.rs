use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

string_enum! {
    MedicationStatus, "medication status" {
        Active => "active",
        Inactive => "inactive",
        Paused => "paused",
    }
}

/// A medication on a patient's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PatientMedication {
    pub id: String,
    pub name: String,
    /// Dose as entered, e.g. `10mg`.
    pub dosage: String,
    pub frequency: String,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub status: MedicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewPatientMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub status: MedicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewPatientMedication {
    pub(crate) fn validate(&self) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::InvalidInput("medication name cannot be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn into_medication(self, id: String) -> PatientMedication {
        PatientMedication {
            id,
            name: self.name.trim().to_string(),
            dosage: self.dosage,
            frequency: self.frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            notes: self.notes,
        }
    }
}
