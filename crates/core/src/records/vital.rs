use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One set of observations for a patient. Every measurement is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PatientVital {
    pub id: String,
    pub date: DateTime<Utc>,
    /// Blood pressure, e.g. `120/80`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<String>,
    /// Heart rate in beats per minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewPatientVital {
    /// Defaults to the time of recording.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewPatientVital {
    pub(crate) fn into_vital(self, id: String, now: DateTime<Utc>) -> PatientVital {
        PatientVital {
            id,
            date: self.date.unwrap_or(now),
            bp: self.bp,
            hr: self.hr,
            temp: self.temp,
            weight: self.weight,
            notes: self.notes,
        }
    }
}
