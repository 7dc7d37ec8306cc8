//! Labeled training data and training report types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::features::EncodingMode;
use super::patient::{Gender, PatientProfile};

/// Label threshold for the binary "adherent" flag stored with each sample.
pub const ADHERENT_THRESHOLD: f64 = 80.0;

/// Error type for model training.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrainingError {
    #[error("Training dataset is empty")]
    EmptyDataset,

    #[error("Not enough samples: need at least {needed}, got {got}")]
    TooFewSamples { needed: usize, got: usize },

    #[error("Gender column is present on some rows but missing on others")]
    MixedGenderColumn,

    #[error("Invalid adherence label at row {row}: {value}")]
    InvalidLabel { row: usize, value: f64 },

    #[error("Model fit failed: {0}")]
    Fit(String),
}

/// One labeled row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub age: u32,
    /// Absent when the dataset carries no gender column
    #[serde(default)]
    pub gender: Option<Gender>,
    pub medication_count: u32,
    pub dosage_frequency: u32,
    pub reminder_enabled: bool,
    pub missed_doses_last_month: u32,
    pub comorbidities: u32,
    pub side_effects: bool,
    pub cost_concern: u32,
    pub adherence_score: f64,
    pub adherent: bool,
}

impl LabeledSample {
    /// Patient attributes of this row. A missing gender becomes `Other`.
    #[must_use]
    pub fn profile(&self) -> PatientProfile {
        PatientProfile {
            age: self.age,
            gender: self.gender.unwrap_or_default(),
            medication_count: self.medication_count,
            dosage_frequency: self.dosage_frequency,
            reminder_enabled: self.reminder_enabled,
            missed_doses_last_month: self.missed_doses_last_month,
            comorbidities: self.comorbidities,
            side_effects: self.side_effects,
            cost_concern: self.cost_concern,
        }
    }
}

/// A full labeled dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub samples: Vec<LabeledSample>,
}

impl TrainingDataset {
    #[must_use]
    pub fn new(samples: Vec<LabeledSample>) -> Self {
        Self { samples }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Encoding mode implied by the gender column.
    ///
    /// # Errors
    /// Returns `MixedGenderColumn` when only some rows carry a gender.
    pub fn encoding_mode(&self) -> Result<EncodingMode, TrainingError> {
        let with_gender = self.samples.iter().filter(|s| s.gender.is_some()).count();
        if with_gender == 0 {
            Ok(EncodingMode::Simple)
        } else if with_gender == self.samples.len() {
            Ok(EncodingMode::OneHotGender)
        } else {
            Err(TrainingError::MixedGenderColumn)
        }
    }

    /// Check labels are finite and inside [0, 100].
    ///
    /// # Errors
    /// Returns the first offending row.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.samples.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        for (row, sample) in self.samples.iter().enumerate() {
            let value = sample.adherence_score;
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(TrainingError::InvalidLabel { row, value });
            }
        }
        self.encoding_mode().map(|_| ())
    }

    /// Share of rows labeled adherent.
    #[must_use]
    pub fn adherent_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let adherent = self.samples.iter().filter(|s| s.adherent).count();
        adherent as f64 / self.samples.len() as f64
    }

    /// Mean adherence score over all rows.
    #[must_use]
    pub fn mean_score(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.adherence_score).sum::<f64>() / self.samples.len() as f64
    }
}

/// Report produced by a successful training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub algorithm: String,
    pub mse: f64,
    pub r2_score: f64,
    pub cv_r2_mean: f64,
    pub cv_r2_std: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub feature_importance: BTreeMap<String, f64>,
    pub encoding_mode: EncodingMode,
    pub train_samples: usize,
    pub test_samples: usize,
}
