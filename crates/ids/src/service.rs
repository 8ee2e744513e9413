//! Internal implementation of the identifier types.

use crate::{IdError, IdResult};
use chrono::{DateTime, Datelike, Utc};
use std::{fmt, str::FromStr};
use uuid::Uuid;

const BASE36_LOWER: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const BASE36_UPPER: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of the random suffix on a medical record number.
const MRN_SUFFIX_LEN: usize = 5;

/// Length of the random suffix on a record id.
const RECORD_SUFFIX_LEN: usize = 6;

/// Draws `len` base36 characters from the random bits of a v4 UUID.
///
/// A v4 UUID carries 122 random bits, enough for 23 base36 digits, so a fresh UUID is taken
/// whenever the current one runs dry.
fn random_base36(len: usize, alphabet: &[u8; 36]) -> String {
    let mut out = String::with_capacity(len);
    let mut bits = Uuid::new_v4().as_u128();
    let mut remaining = 23;

    while out.len() < len {
        if remaining == 0 {
            bits = Uuid::new_v4().as_u128();
            remaining = 23;
        }
        out.push(alphabet[(bits % 36) as usize] as char);
        bits /= 36;
        remaining -= 1;
    }

    out
}

fn is_base36(input: &str, alphabet: &[u8; 36]) -> bool {
    input.bytes().all(|b| alphabet.contains(&b))
}

// ============================================================================
// PATIENT ID
// ============================================================================

/// A patient sequence identifier, zero-padded to at least three digits.
///
/// [`PatientId::from_sequence`] formats a sequence number (`1` becomes `001`). Identifiers read
/// back from storage stay plain strings, since imported snapshots may carry any id; only
/// [`PatientId::sequence_of`] looks inside them.
///
/// Sequence numbers start at 1. Numbers above 999 simply grow wider (`1000`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatientId(u32);

impl PatientId {
    /// Creates the identifier for a sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `sequence` is zero.
    pub fn from_sequence(sequence: u32) -> IdResult<Self> {
        if sequence == 0 {
            return Err(IdError::InvalidInput(
                "patient sequence numbers start at 1".into(),
            ));
        }
        Ok(Self(sequence))
    }

    /// Returns the identifier that follows `last_issued`.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if the sequence would overflow.
    pub fn next_after(last_issued: u32) -> IdResult<Self> {
        let next = last_issued.checked_add(1).ok_or_else(|| {
            IdError::InvalidInput("patient sequence exhausted".into())
        })?;
        Self::from_sequence(next)
    }

    /// Reads the sequence number out of any all-digit identifier.
    ///
    /// This is deliberately lenient so identifiers restored from older snapshots (`"7"`, `"0042"`)
    /// still take part in sequence allocation. Returns `None` for non-numeric identifiers.
    pub fn sequence_of(input: &str) -> Option<u32> {
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        input.parse().ok()
    }

    /// Returns the sequence number.
    pub fn sequence(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

// ============================================================================
// MEDICAL RECORD NUMBER
// ============================================================================

/// A medical record number: `MRN-<year>-<patient id>-<suffix>`.
///
/// Example: `MRN-2025-001-K3Z9Q`
///
/// The suffix is five characters from `A-Z0-9`. MRNs are issued once at patient creation and
/// never change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Mrn {
    year: i32,
    patient_id: PatientId,
    suffix: String,
}

impl Mrn {
    /// Generates a new MRN for `patient_id` in the year of `issued_at`.
    pub fn generate(issued_at: DateTime<Utc>, patient_id: &PatientId) -> Self {
        Self {
            year: issued_at.year(),
            patient_id: patient_id.clone(),
            suffix: random_base36(MRN_SUFFIX_LEN, BASE36_UPPER),
        }
    }

    /// Returns the random suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for Mrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MRN-{}-{}-{}", self.year, self.patient_id, self.suffix)
    }
}

// ============================================================================
// RECORD ID
// ============================================================================

/// The record families that carry a [`RecordId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Note,
    Event,
    Vital,
    Medication,
    Document,
}

impl RecordKind {
    /// Returns the identifier prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            RecordKind::Note => "note",
            RecordKind::Event => "event",
            RecordKind::Vital => "vital",
            RecordKind::Medication => "med",
            RecordKind::Document => "doc",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "note" => Some(RecordKind::Note),
            "event" => Some(RecordKind::Event),
            "vital" => Some(RecordKind::Vital),
            "med" => Some(RecordKind::Medication),
            "doc" => Some(RecordKind::Document),
            _ => None,
        }
    }
}

/// A time-prefixed record identifier.
///
/// Format:
/// `<prefix>-<unix millis>-<suffix>`
///
/// Example:
/// `note-1736604922045-k3z9qa`
///
/// The suffix is six characters from `a-z0-9`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordId {
    kind: RecordKind,
    millis: i64,
    suffix: String,
}

impl RecordId {
    /// Generates a new identifier stamped with the current time.
    pub fn generate(kind: RecordKind) -> Self {
        Self {
            kind,
            millis: Utc::now().timestamp_millis(),
            suffix: random_base36(RECORD_SUFFIX_LEN, BASE36_LOWER),
        }
    }

    /// Returns the record family.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Returns the random suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.kind.prefix(), self.millis, self.suffix)
    }
}

impl FromStr for RecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let (Some(prefix), Some(millis), Some(suffix)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(IdError::InvalidInput(format!(
                "Invalid record id format: '{}'",
                s
            )));
        };

        let kind = RecordKind::from_prefix(prefix).ok_or_else(|| {
            IdError::InvalidInput(format!("Unknown record id prefix '{}' in '{}'", prefix, s))
        })?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::InvalidInput(format!(
                "Invalid record id timestamp in '{}'",
                s
            )));
        }
        let millis: i64 = millis.parse().map_err(|_| {
            IdError::InvalidInput(format!("Invalid record id timestamp in '{}'", s))
        })?;

        if suffix.is_empty() || !is_base36(suffix, BASE36_LOWER) {
            return Err(IdError::InvalidInput(format!(
                "Record id suffix must be lowercase base36: '{}'",
                s
            )));
        }

        Ok(Self {
            kind,
            millis,
            suffix: suffix.to_owned(),
        })
    }
}
