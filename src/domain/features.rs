//! Feature encoding: patient profile -> fixed-order numeric vector.
//!
//! Two layouts exist. `Simple` emits nine scalars with gender as a single
//! code column. `OneHotGender` replaces the gender code by three indicator
//! columns and follows the column order recorded when the model was fit.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::patient::PatientProfile;

/// Column names of the `Simple` layout, in emission order.
pub const SIMPLE_FEATURE_NAMES: [&str; 9] = [
    "age",
    "gender",
    "medication_count",
    "dosage_frequency",
    "reminder_enabled",
    "missed_doses_last_month",
    "comorbidities",
    "side_effects",
    "cost_concern",
];

/// Default column order of the `OneHotGender` layout: the numeric columns
/// followed by the gender indicators.
pub const ONE_HOT_FEATURE_NAMES: [&str; 11] = [
    "age",
    "medication_count",
    "dosage_frequency",
    "reminder_enabled",
    "missed_doses_last_month",
    "comorbidities",
    "side_effects",
    "cost_concern",
    "gender_0",
    "gender_1",
    "gender_2",
];

/// Error type for feature encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("One-hot gender encoding requires the recorded feature order")]
    MissingFeatureOrder,

    #[error("Unknown feature in recorded order: {0}")]
    UnknownFeature(String),

    #[error("Duplicate feature in recorded order: {0}")]
    DuplicateFeature(String),

    #[error("Feature vector length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Which layout the active model was fit with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodingMode {
    Simple,
    OneHotGender,
}

impl std::fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "SIMPLE"),
            Self::OneHotGender => write!(f, "ONE_HOT_GENDER"),
        }
    }
}

/// An encoded feature row tagged with the layout that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatureVector {
    pub mode: EncodingMode,
    pub values: Vec<f64>,
}

impl EncodedFeatureVector {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Value of a named one-hot column for `profile`.
fn one_hot_value(profile: &PatientProfile, name: &str) -> Option<f64> {
    let gender = profile.gender.code();
    let value = match name {
        "age" => f64::from(profile.age),
        "medication_count" => f64::from(profile.medication_count),
        "dosage_frequency" => f64::from(profile.dosage_frequency),
        "reminder_enabled" => flag(profile.reminder_enabled),
        "missed_doses_last_month" => f64::from(profile.missed_doses_last_month),
        "comorbidities" => f64::from(profile.comorbidities),
        "side_effects" => flag(profile.side_effects),
        "cost_concern" => f64::from(profile.cost_concern),
        "gender_0" => flag(gender == 0),
        "gender_1" => flag(gender == 1),
        "gender_2" => flag(gender == 2),
        _ => return None,
    };
    Some(value)
}

/// Check a recorded column order against the layout of `mode`.
///
/// `Simple` accepts only its fixed order. `OneHotGender` accepts any
/// permutation of its eleven columns, each named exactly once.
///
/// # Errors
/// Returns `LengthMismatch` for the wrong width, `UnknownFeature` for a
/// column outside the layout and `DuplicateFeature` for a repeated one.
pub fn check_feature_order(mode: EncodingMode, order: &[String]) -> Result<(), EncodingError> {
    let expected: &[&str] = match mode {
        EncodingMode::Simple => &SIMPLE_FEATURE_NAMES,
        EncodingMode::OneHotGender => &ONE_HOT_FEATURE_NAMES,
    };
    if order.len() != expected.len() {
        return Err(EncodingError::LengthMismatch {
            expected: expected.len(),
            actual: order.len(),
        });
    }

    match mode {
        EncodingMode::Simple => {
            if let Some((got, _)) = order
                .iter()
                .zip(expected)
                .find(|(got, want)| got.as_str() != **want)
            {
                return Err(EncodingError::UnknownFeature(got.clone()));
            }
        }
        EncodingMode::OneHotGender => {
            let mut seen = HashSet::with_capacity(order.len());
            for name in order {
                if !expected.contains(&name.as_str()) {
                    return Err(EncodingError::UnknownFeature(name.clone()));
                }
                if !seen.insert(name.as_str()) {
                    return Err(EncodingError::DuplicateFeature(name.clone()));
                }
            }
        }
    }
    Ok(())
}

/// Encode a profile in the given layout.
///
/// `feature_order` is the column order recorded at training time. It is
/// mandatory for `OneHotGender`; for `Simple` it is optional and, when
/// present, must describe the nine `Simple` columns.
///
/// # Errors
/// Returns `EncodingError` when the recorded order is absent or is not
/// a valid order for the layout (see [`check_feature_order`]).
pub fn encode(
    profile: &PatientProfile,
    mode: EncodingMode,
    feature_order: Option<&[String]>,
) -> Result<EncodedFeatureVector, EncodingError> {
    match mode {
        EncodingMode::Simple => {
            if let Some(order) = feature_order {
                check_feature_order(mode, order)?;
            }

            let values = vec![
                f64::from(profile.age) / 100.0,
                f64::from(profile.gender.code()),
                f64::from(profile.medication_count),
                f64::from(profile.dosage_frequency),
                flag(profile.reminder_enabled),
                f64::from(profile.missed_doses_last_month),
                f64::from(profile.comorbidities),
                flag(profile.side_effects),
                f64::from(profile.cost_concern),
            ];
            Ok(EncodedFeatureVector { mode, values })
        }
        EncodingMode::OneHotGender => {
            let order = feature_order.ok_or(EncodingError::MissingFeatureOrder)?;
            check_feature_order(mode, order)?;

            let values = order
                .iter()
                .map(|name| {
                    one_hot_value(profile, name)
                        .ok_or_else(|| EncodingError::UnknownFeature(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(EncodedFeatureVector { mode, values })
        }
    }
}

/// Column names for `mode` in their default order.
#[must_use]
pub fn default_feature_names(mode: EncodingMode) -> Vec<String> {
    match mode {
        EncodingMode::Simple => SIMPLE_FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
        EncodingMode::OneHotGender => {
            ONE_HOT_FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect()
        }
    }
}
