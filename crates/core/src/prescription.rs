//! Prescription documents rendered as Markdown.
//!
//! A prescription carries the patient block, the prescriber's free-text instructions, a table of
//! medications and a signature block with a short verification hash. The free text is escaped so
//! it cannot introduce headings, rules or code fences into the document.
//!
//! Document layout:
//!
//! ```markdown
//! # MedIQ Healthcare
//! Digital Prescription
//!
//! ## Patient information
//!
//! **Name:** <name>
//! **Age:** <age> years
//! **MRN:** <mrn>
//! **Date:** <YYYY-MM-DD>
//! **Time:** <HH:MM>
//!
//! ## Prescription details
//!
//! <escaped body>
//!
//! ## Medications
//!
//! | # | Medicine | Dosage | Frequency | Duration |
//! |---|---|---|---|---|
//! | 1 | ... |
//!
//! ---
//!
//! **Digitally signed by:** <doctor>
//! **Verification hash:** <16 chars>
//! ```

use crate::constants::{MAX_DOCTOR_NAME_LEN, MAX_PRESCRIPTION_CONTENT_LEN};
use crate::error::{RecordType, StoreError, StoreResult};
use crate::records::{Patient, PatientMedication};
use crate::repositories::Repository;
use crate::store::KeyValueStore;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use mediq_types::NonEmptyText;

const HEADER: &str = "# MedIQ Healthcare";
const HASH_LEN: usize = 16;

/// One row of the medication table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescribedMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

impl From<&PatientMedication> for PrescribedMedication {
    fn from(med: &PatientMedication) -> Self {
        let duration = match &med.end_date {
            Some(end) => format!("{} to {}", med.start_date, end),
            None => format!("From {}", med.start_date),
        };
        Self {
            name: med.name.clone(),
            dosage: med.dosage.clone(),
            frequency: med.frequency.clone(),
            duration,
        }
    }
}

/// Everything needed to render one prescription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescriptionData {
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_mrn: String,
    pub doctor_name: NonEmptyText,
    pub date: DateTime<Utc>,
    pub content: NonEmptyText,
    pub medications: Vec<PrescribedMedication>,
}

impl PrescriptionData {
    /// Builds prescription input from stored records.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Text` if the doctor name or content is blank or longer than
    /// [`MAX_DOCTOR_NAME_LEN`] / [`MAX_PRESCRIPTION_CONTENT_LEN`] characters.
    pub fn from_records(
        patient: &Patient,
        doctor_name: &str,
        content: &str,
        medications: &[PatientMedication],
        date: DateTime<Utc>,
    ) -> StoreResult<Self> {
        Ok(Self {
            patient_name: patient.name.clone(),
            patient_age: patient.age,
            patient_mrn: patient.mrn.clone(),
            doctor_name: NonEmptyText::bounded(doctor_name, MAX_DOCTOR_NAME_LEN)?,
            date,
            content: NonEmptyText::bounded(content, MAX_PRESCRIPTION_CONTENT_LEN)?,
            medications: medications.iter().map(PrescribedMedication::from).collect(),
        })
    }
}

/// Renders prescription documents.
#[derive(Debug, Clone, Default)]
pub struct PrescriptionService;

impl PrescriptionService {
    pub fn new() -> Self {
        Self
    }

    /// Renders `data` as a Markdown document signed at `signed_at`.
    ///
    /// The medications section is left out when there are no medications.
    pub fn render(
        &self,
        data: &PrescriptionData,
        signed_at: DateTime<Utc>,
    ) -> StoreResult<NonEmptyText> {
        let mut output = String::new();

        output.push_str(HEADER);
        output.push_str("\nDigital Prescription\n\n");

        output.push_str("## Patient information\n\n");
        output.push_str(&format!("**Name:** {}\n", inline(&data.patient_name)));
        output.push_str(&format!("**Age:** {} years\n", data.patient_age));
        output.push_str(&format!("**MRN:** {}\n", inline(&data.patient_mrn)));
        output.push_str(&format!("**Date:** {}\n", data.date.format("%Y-%m-%d")));
        output.push_str(&format!("**Time:** {}\n\n", data.date.format("%H:%M")));

        output.push_str("## Prescription details\n\n");
        output.push_str(&escape_body(data.content.as_str()));
        output.push_str("\n\n");

        if !data.medications.is_empty() {
            output.push_str("## Medications\n\n");
            output.push_str("| # | Medicine | Dosage | Frequency | Duration |\n");
            output.push_str("|---|---|---|---|---|\n");
            for (i, med) in data.medications.iter().enumerate() {
                output.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    i + 1,
                    cell(&med.name),
                    cell(&med.dosage),
                    cell(&med.frequency),
                    cell(&med.duration)
                ));
            }
            output.push('\n');
        }

        output.push_str("---\n\n");
        output.push_str(&format!(
            "**Digitally signed by:** {}\n",
            inline(data.doctor_name.as_str())
        ));
        output.push_str(&format!(
            "**Verification hash:** {}\n",
            verification_hash(&data.patient_mrn, signed_at)
        ));

        Ok(NonEmptyText::new(output)?)
    }
}

/// First 16 characters of `base64("<mrn>-<unix millis>")`.
pub fn verification_hash(mrn: &str, signed_at: DateTime<Utc>) -> String {
    let encoded =
        general_purpose::STANDARD.encode(format!("{}-{}", mrn, signed_at.timestamp_millis()));
    encoded.chars().take(HASH_LEN).collect()
}

impl<S: KeyValueStore> Repository<S> {
    /// Renders a prescription for a stored patient listing their active medications.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the patient does not exist, or `StoreError::Text` if
    /// the doctor name or content is blank.
    pub fn prescription_for(
        &self,
        patient_id: &str,
        doctor_name: &str,
        content: &str,
    ) -> StoreResult<NonEmptyText> {
        let patient = self
            .get_patient(patient_id)
            .ok_or_else(|| StoreError::not_found(RecordType::Patient, patient_id))?;
        let medications = self.list_active_medications(patient_id);
        let now = Utc::now();
        let data =
            PrescriptionData::from_records(&patient, doctor_name, content, &medications, now)?;
        PrescriptionService::new().render(&data, now)
    }
}

/// Escapes Markdown block syntax in free text.
///
/// - `#` at line start becomes `\#`
/// - a line that is only `---`, `***` or `___` is escaped
/// - triple backticks become `` \`\`\` ``
fn escape_body(body: &str) -> String {
    body.lines()
        .map(|line| {
            let trimmed = line.trim();
            if line.trim_start().starts_with('#') {
                line.replacen('#', r"\#", 1)
            } else if trimmed == "---" || trimmed == "***" || trimmed == "___" {
                format!(r"\{}", trimmed)
            } else {
                line.replace("```", r"\`\`\`")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-line field value.
fn inline(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Table cell value: single line with pipes escaped.
fn cell(value: &str) -> String {
    inline(value).replace('|', r"\|")
}
