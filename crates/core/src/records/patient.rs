use super::{merge, merge_opt};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum and maximum patient name length, in characters.
const NAME_LEN: (usize, usize) = (2, 100);
const MAX_AGE: u32 = 150;
const PHONE_LEN: (usize, usize) = (7, 20);
const MAX_CITY_LEN: usize = 50;

string_enum! {
    /// Administrative sex as recorded at registration.
    Sex, "sex" {
        Male => "M",
        Female => "F",
        Other => "Other",
    }
}

string_enum! {
    /// Where the patient sits in the care workflow.
    PatientStatus, "patient status" {
        New => "new",
        Stable => "stable",
        FollowUp => "follow-up",
        Urgent => "urgent",
        Inactive => "inactive",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub mrn: String,
    pub name: String,
    pub age: u32,
    pub sex: Sex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub status: PatientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<DateTime<Utc>>,
}

/// Registration details supplied by the caller. Identifiers and status are assigned by the
/// repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub name: String,
    pub age: u32,
    pub sex: Sex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl CreatePatientRequest {
    /// Checks the registration rules and returns a copy with surrounding whitespace trimmed.
    /// Blank optional fields are dropped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` naming the first rule that failed.
    pub fn validate(&self) -> StoreResult<Self> {
        let name = validate_name(&self.name)?;
        validate_age(self.age)?;
        let phone = trimmed(self.phone.as_deref());
        if let Some(phone) = &phone {
            validate_phone(phone)?;
        }
        let city = trimmed(self.city.as_deref());
        if let Some(city) = &city {
            validate_city(city)?;
        }

        Ok(Self {
            name,
            age: self.age,
            sex: self.sex,
            phone,
            city,
        })
    }
}

/// Partial patient update. Absent fields are left unchanged; `id` and `mrn` cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PatientStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<DateTime<Utc>>,
}

impl PatientUpdate {
    /// Applies the registration rules to whichever fields are present.
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone.trim())?;
        }
        if let Some(city) = &self.city {
            validate_city(city.trim())?;
        }
        Ok(())
    }

    /// Shallow-merges the present fields over `patient`.
    pub fn apply(self, patient: &mut Patient) {
        merge(&mut patient.name, self.name.map(|n| n.trim().to_string()));
        merge(&mut patient.age, self.age);
        merge(&mut patient.sex, self.sex);
        merge_opt(&mut patient.phone, self.phone.map(|p| p.trim().to_string()));
        merge_opt(&mut patient.city, self.city.map(|c| c.trim().to_string()));
        merge(&mut patient.status, self.status);
        merge_opt(&mut patient.last_visit, self.last_visit);
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_name(name: &str) -> StoreResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if len < NAME_LEN.0 || len > NAME_LEN.1 {
        return Err(StoreError::InvalidInput(format!(
            "name must be between {} and {} characters",
            NAME_LEN.0, NAME_LEN.1
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'')
    {
        return Err(StoreError::InvalidInput(
            "name may only contain letters, spaces, hyphens and apostrophes".into(),
        ));
    }
    Ok(name.to_string())
}

fn validate_age(age: u32) -> StoreResult<()> {
    if age > MAX_AGE {
        return Err(StoreError::InvalidInput(format!(
            "age must be between 0 and {}",
            MAX_AGE
        )));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> StoreResult<()> {
    let len = phone.chars().count();
    if len < PHONE_LEN.0 || len > PHONE_LEN.1 {
        return Err(StoreError::InvalidInput(format!(
            "phone must be between {} and {} characters",
            PHONE_LEN.0, PHONE_LEN.1
        )));
    }
    Ok(())
}

fn validate_city(city: &str) -> StoreResult<()> {
    if city.chars().count() > MAX_CITY_LEN {
        return Err(StoreError::InvalidInput(format!(
            "city must be at most {} characters",
            MAX_CITY_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CreatePatientRequest {
        CreatePatientRequest {
            name: name.into(),
            age: 30,
            sex: Sex::Female,
            phone: None,
            city: None,
        }
    }

    #[test]
    fn test_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&PatientStatus::FollowUp).unwrap(),
            "\"follow-up\""
        );
        assert_eq!("follow-up".parse::<PatientStatus>().unwrap(), PatientStatus::FollowUp);
        assert!("discharged".parse::<PatientStatus>().is_err());
        assert_eq!(serde_json::to_string(&Sex::Male).unwrap(), "\"M\"");
    }

    #[test]
    fn test_patient_json_layout() {
        let patient = Patient {
            id: "001".into(),
            mrn: "MRN-2025-001-AB12C".into(),
            name: "Ada Lovelace".into(),
            age: 30,
            sex: Sex::Female,
            phone: None,
            city: Some("London".into()),
            status: PatientStatus::New,
            last_visit: None,
        };
        let value = serde_json::to_value(&patient).unwrap();
        assert_eq!(value["city"], "London");
        assert_eq!(value["sex"], "F");
        assert!(value.get("phone").is_none());
        assert!(value.get("lastVisit").is_none());
    }

    #[test]
    fn test_validate_trims_and_drops_blank_fields() {
        let mut req = request("  Ada Lovelace ");
        req.phone = Some("   ".into());
        req.city = Some(" London ".into());
        let valid = req.validate().unwrap();
        assert_eq!(valid.name, "Ada Lovelace");
        assert_eq!(valid.phone, None);
        assert_eq!(valid.city.as_deref(), Some("London"));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(request("A").validate().is_err());
        assert!(request("R2-D2").validate().is_err());
        assert!(request(&"a".repeat(101)).validate().is_err());
        assert!(request("Mary-Jane O'Neil").validate().is_ok());

        let mut old = request("Ada Lovelace");
        old.age = 151;
        assert!(old.validate().is_err());

        let mut short_phone = request("Ada Lovelace");
        short_phone.phone = Some("123".into());
        assert!(short_phone.validate().is_err());

        let mut long_city = request("Ada Lovelace");
        long_city.city = Some("x".repeat(51));
        assert!(long_city.validate().is_err());
    }

    #[test]
    fn test_update_merges_present_fields_only() {
        let mut patient = Patient {
            id: "001".into(),
            mrn: "MRN-2025-001-AB12C".into(),
            name: "Ada Lovelace".into(),
            age: 30,
            sex: Sex::Female,
            phone: Some("555-0001".into()),
            city: None,
            status: PatientStatus::New,
            last_visit: None,
        };
        let update = PatientUpdate {
            status: Some(PatientStatus::Urgent),
            city: Some("London".into()),
            ..Default::default()
        };
        update.apply(&mut patient);

        assert_eq!(patient.status, PatientStatus::Urgent);
        assert_eq!(patient.city.as_deref(), Some("London"));
        assert_eq!(patient.phone.as_deref(), Some("555-0001"));
        assert_eq!(patient.mrn, "MRN-2025-001-AB12C");
    }

    #[test]
    fn test_update_ignores_identity_fields_in_json() {
        let update: PatientUpdate =
            serde_json::from_str(r#"{"id":"999","mrn":"MRN-X","age":31}"#).unwrap();
        assert_eq!(update.age, Some(31));
        assert_eq!(update.name, None);
    }
}
