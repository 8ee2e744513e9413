//! Dose strings such as `10mg` or `2tablets`.
//!
//! Medications store their dose as a single free-text string. These helpers split it back into
//! a numeric value and a unit, and validate a value entered on its own.

use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::str::FromStr;

/// Unit assumed when a dose string carries none.
pub const DEFAULT_DOSE_UNIT: &str = "mg";

/// Units offered when recording a dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoseUnit {
    Mg,
    G,
    Mcg,
    Ml,
    Units,
    Tablets,
    Capsules,
}

impl DoseUnit {
    pub const ALL: [DoseUnit; 7] = [
        DoseUnit::Mg,
        DoseUnit::G,
        DoseUnit::Mcg,
        DoseUnit::Ml,
        DoseUnit::Units,
        DoseUnit::Tablets,
        DoseUnit::Capsules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DoseUnit::Mg => "mg",
            DoseUnit::G => "g",
            DoseUnit::Mcg => "mcg",
            DoseUnit::Ml => "ml",
            DoseUnit::Units => "units",
            DoseUnit::Tablets => "tablets",
            DoseUnit::Capsules => "capsules",
        }
    }

    /// Human-readable label, e.g. `mg (milligrams)`.
    pub fn label(&self) -> &'static str {
        match self {
            DoseUnit::Mg => "mg (milligrams)",
            DoseUnit::G => "g (grams)",
            DoseUnit::Mcg => "mcg (micrograms)",
            DoseUnit::Ml => "ml (milliliters)",
            DoseUnit::Units => "units",
            DoseUnit::Tablets => "tablets",
            DoseUnit::Capsules => "capsules",
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseUnit {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DoseUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| StoreError::InvalidInput(format!("unknown dose unit '{}'", s)))
    }
}

/// A dose split into its value and unit parts.
///
/// The value is kept as text so that whatever was entered can be shown back unchanged; use
/// [`Dose::validate_value`] to check it is a positive number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dose {
    pub value: String,
    pub unit: String,
}

impl Dose {
    pub fn new(value: impl Into<String>, unit: DoseUnit) -> Self {
        Self {
            value: value.into(),
            unit: unit.as_str().to_string(),
        }
    }

    /// Splits a dose string.
    ///
    /// - `<number><letters>` (e.g. `5.5ml`) gives that value and unit.
    /// - Anything else that starts with a number gives the number and the default unit.
    /// - Everything else, including the empty string, gives an empty value and the default unit.
    ///
    /// A "number" here is any run of digits and dots.
    pub fn parse(input: &str) -> Self {
        let split = input
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(input.len());
        let (number, rest) = input.split_at(split);

        if number.is_empty() {
            return Self::unparsed();
        }

        let unit = if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphabetic()) {
            rest
        } else {
            DEFAULT_DOSE_UNIT
        };

        Self {
            value: number.to_string(),
            unit: unit.to_string(),
        }
    }

    fn unparsed() -> Self {
        Self {
            value: String::new(),
            unit: DEFAULT_DOSE_UNIT.to_string(),
        }
    }

    /// Returns the unit if it is one of the offered [`DoseUnit`]s.
    pub fn known_unit(&self) -> Option<DoseUnit> {
        self.unit.parse().ok()
    }

    /// Checks that a dose value is a positive, finite number.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if the value is blank, not a number, or not positive.
    pub fn validate_value(value: &str) -> StoreResult<f64> {
        let value = value.trim();
        if value.is_empty() {
            return Err(StoreError::InvalidInput("dose value is required".into()));
        }
        match value.parse::<f64>() {
            Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
            _ => Err(StoreError::InvalidInput(
                "dose must be a valid positive number".into(),
            )),
        }
    }
}

impl fmt::Display for Dose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}
