//! Patient attributes used for adherence prediction.
//!
//! `PatientInput` is the loosely-typed request shape (every key optional);
//! `PatientProfile` is the validated record the scoring core consumes.

use serde::{Deserialize, Serialize};

/// Patient gender as recorded on the intake form.
///
/// Unrecognized values are treated as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl Gender {
    /// Numeric code used by the feature encoder and the training data.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Male => 0,
            Self::Female => 1,
            Self::Other => 2,
        }
    }

    /// Inverse of [`Gender::code`]; unknown codes map to `Other`.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Male,
            1 => Self::Female,
            _ => Self::Other,
        }
    }
}

impl From<&str> for Gender {
    fn from(value: &str) -> Self {
        match value.trim() {
            "Male" | "male" | "M" => Self::Male,
            "Female" | "female" | "F" => Self::Female,
            _ => Self::Other,
        }
    }
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// Validated patient attributes, immutable per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub age: u32,
    pub gender: Gender,
    pub medication_count: u32,
    /// Doses per day
    pub dosage_frequency: u32,
    pub reminder_enabled: bool,
    pub missed_doses_last_month: u32,
    pub comorbidities: u32,
    pub side_effects: bool,
    /// Self-reported cost concern on a 1-5 scale
    pub cost_concern: u32,
}

impl Default for PatientProfile {
    fn default() -> Self {
        Self {
            age: 0,
            gender: Gender::Other,
            medication_count: 1,
            dosage_frequency: 1,
            reminder_enabled: false,
            missed_doses_last_month: 0,
            comorbidities: 0,
            side_effects: false,
            cost_concern: 1,
        }
    }
}

/// Raw request payload. Missing keys take the documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientInput {
    pub age: i64,
    pub gender: Gender,
    pub medication_count: i64,
    pub dosage_frequency: i64,
    pub reminder_enabled: bool,
    pub missed_doses_last_month: i64,
    pub comorbidities: i64,
    pub side_effects: bool,
    pub cost_concern: i64,
}

impl Default for PatientInput {
    fn default() -> Self {
        Self {
            age: 0,
            gender: Gender::Other,
            medication_count: 1,
            dosage_frequency: 1,
            reminder_enabled: false,
            missed_doses_last_month: 0,
            comorbidities: 0,
            side_effects: false,
            cost_concern: 1,
        }
    }
}

impl PatientInput {
    /// Validate every field and build a [`PatientProfile`].
    ///
    /// # Errors
    /// Returns all validation failures at once.
    pub fn validate(&self) -> Result<PatientProfile, Vec<String>> {
        let mut errors = Vec::new();

        let mut non_negative = |name: &str, value: i64| -> u32 {
            match u32::try_from(value) {
                Ok(v) => v,
                Err(_) => {
                    errors.push(format!("{name} {value} must be a non-negative integer"));
                    0
                }
            }
        };

        let age = non_negative("age", self.age);
        let medication_count = non_negative("medication_count", self.medication_count);
        let dosage_frequency = non_negative("dosage_frequency", self.dosage_frequency);
        let missed_doses_last_month =
            non_negative("missed_doses_last_month", self.missed_doses_last_month);
        let comorbidities = non_negative("comorbidities", self.comorbidities);

        if !(1..=5).contains(&self.cost_concern) {
            errors.push(format!(
                "cost_concern {} out of range [1, 5]",
                self.cost_concern
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PatientProfile {
            age,
            gender: self.gender,
            medication_count,
            dosage_frequency,
            reminder_enabled: self.reminder_enabled,
            missed_doses_last_month,
            comorbidities,
            side_effects: self.side_effects,
            // Range checked above.
            cost_concern: self.cost_concern as u32,
        })
    }
}

impl TryFrom<PatientInput> for PatientProfile {
    type Error = crate::AdherewiseError;

    fn try_from(input: PatientInput) -> Result<Self, Self::Error> {
        input
            .validate()
            .map_err(|errors| crate::AdherewiseError::Validation(errors.join("; ")))
    }
}
