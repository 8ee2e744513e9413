//! Record types persisted by the repository.
//!
//! All records serialise with camelCase field names and omit absent optional fields, so the JSON
//! written here is the persisted storage layout.

/// Declares a closed set of string values with serde, `Display` and `FromStr` agreeing on the
/// same wire form.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the wire form of the value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::error::StoreError::InvalidInput(format!(
                        "unknown {} '{}' (expected one of: {})",
                        $label,
                        other,
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }
    };
}

mod event;
mod medication;
mod metadata;
mod note;
mod patient;
mod vital;

pub use event::{CalendarEvent, CalendarEventUpdate, EventStatus, EventType, NewCalendarEvent};
pub use medication::{MedicationStatus, NewPatientMedication, PatientMedication};
pub use metadata::{StorageMetadata, StorageStats};
pub use note::{ClinicalNote, ClinicalNoteUpdate, NewClinicalNote, NoteType};
pub use patient::{CreatePatientRequest, Patient, PatientStatus, PatientUpdate, Sex};
pub use vital::{NewPatientVital, PatientVital};

/// Replaces `target` with the update value when one was supplied.
pub(crate) fn merge<T>(target: &mut T, update: Option<T>) {
    if let Some(value) = update {
        *target = value;
    }
}

/// Like [`merge`], for optional fields on the record.
pub(crate) fn merge_opt<T>(target: &mut Option<T>, update: Option<T>) {
    if update.is_some() {
        *target = update;
    }
}
