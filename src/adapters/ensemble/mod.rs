//! Ensemble adapter: bagging forest + gradient boosting, averaged.
//!
//! The fitted models, the scaler and the encoding metadata travel together
//! in a versioned [`TrainedArtifact`], which is also the estimator used for
//! prediction.

mod boosting;
mod forest;
pub mod metrics;
mod scaler;
mod trainer;
mod tree;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapters::StorageError;
use crate::domain::{
    check_feature_order, encode, recommendations, EncodingError, EncodingMode, EstimatorKind,
    PatientProfile, PredictionResult, TrainingMetrics,
};
use crate::ports::{AdherenceEstimator, StoredArtifact};

pub use boosting::{BoostingParams, GradientBoosting};
pub use forest::{sqrt_features, ForestParams, RandomForest};
pub use scaler::StandardScaler;
pub use trainer::{EnsembleTrainer, TrainerConfig, CLASSIFICATION_THRESHOLD, MIN_TRAINING_SAMPLES};
pub use tree::{RegressionTree, TreeParams};

/// Current layout of [`TrainedArtifact`]. Bump on any field change.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// Label reported in training metrics.
pub const ALGORITHM_LABEL: &str = "Ensemble (Random Forest + Gradient Boosting)";

const CONFIDENCE_BASE: f64 = 70.0;
const CONFIDENCE_CAP: f64 = 95.0;

/// Confidence reported for an ensemble score: `min(95, 70 + score / 5)`.
#[must_use]
pub fn ensemble_confidence(score: f64) -> f64 {
    (CONFIDENCE_BASE + score / 5.0).min(CONFIDENCE_CAP)
}

/// Everything needed to score a patient with the trained ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub schema_version: u32,
    pub encoding_mode: EncodingMode,
    /// Column order the models were fit with
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
    pub boosting: GradientBoosting,
    /// From the forest only
    pub feature_importance: BTreeMap<String, f64>,
    pub metrics: TrainingMetrics,
    pub trained_at: chrono::DateTime<chrono::Utc>,
}

impl TrainedArtifact {
    /// Serialize for storage.
    ///
    /// # Errors
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        bincode::serialize(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Rebuild an artifact from its stored form.
    ///
    /// # Errors
    /// Returns `UnsupportedSchema` for any version other than
    /// [`ARTIFACT_SCHEMA_VERSION`] and `Serialization` for a corrupt blob.
    pub fn from_stored(stored: &StoredArtifact) -> Result<Self, StorageError> {
        if stored.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema {
                found: stored.schema_version,
                expected: ARTIFACT_SCHEMA_VERSION,
            });
        }

        let artifact: Self = bincode::deserialize(&stored.blob)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if artifact.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema {
                found: artifact.schema_version,
                expected: ARTIFACT_SCHEMA_VERSION,
            });
        }
        artifact
            .check_layout()
            .map_err(StorageError::InconsistentArtifact)?;
        Ok(artifact)
    }

    /// Check that the recorded column order fits the encoding mode and
    /// the width every fitted component expects.
    ///
    /// # Errors
    /// Returns the first `EncodingError` found.
    pub fn check_layout(&self) -> Result<(), EncodingError> {
        check_feature_order(self.encoding_mode, &self.feature_names)?;

        let width = self.feature_names.len();
        let fitted = [
            Some(self.scaler.n_features()),
            Some(self.forest.n_features()),
            self.boosting.n_features(),
        ];
        if let Some(actual) = fitted.into_iter().flatten().find(|n| *n != width) {
            return Err(EncodingError::LengthMismatch {
                expected: width,
                actual,
            });
        }
        Ok(())
    }

    /// Clipped ensemble score for one patient.
    ///
    /// # Errors
    /// Returns `EncodingError` if the artifact layout is inconsistent or the
    /// profile cannot be laid out in the recorded column order.
    pub fn score(&self, profile: &PatientProfile) -> Result<f64, EncodingError> {
        self.check_layout()?;
        let encoded = encode(profile, self.encoding_mode, Some(&self.feature_names))?;
        let scaled = self.scaler.transform(encoded.as_slice())?;

        let raw = (self.forest.predict(&scaled) + self.boosting.predict(&scaled)) / 2.0;
        Ok(raw.clamp(0.0, 100.0))
    }
}

impl AdherenceEstimator for TrainedArtifact {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Ensemble
    }

    fn estimate(&self, profile: &PatientProfile) -> crate::Result<PredictionResult> {
        let score = self.score(profile)?;
        Ok(PredictionResult::new(
            score,
            ensemble_confidence(score),
            recommendations::synthesize(profile, score),
            EstimatorKind::Ensemble,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::synthesizer::{generate, SynthesizerConfig};

    fn small_artifact() -> TrainedArtifact {
        let dataset = generate(&SynthesizerConfig {
            samples: 120,
            seed: 3,
            include_gender: true,
        });
        EnsembleTrainer::new(TrainerConfig::fast(3))
            .train(&dataset)
            .expect("Should train")
    }

    #[test]
    fn test_confidence_formula() {
        assert_eq!(ensemble_confidence(0.0), 70.0);
        assert_eq!(ensemble_confidence(50.0), 80.0);
        assert_eq!(ensemble_confidence(100.0), 90.0);
        assert!(ensemble_confidence(100.0) <= 95.0);
    }

    #[test]
    fn test_estimate_shape() {
        let artifact = small_artifact();
        let result = artifact
            .estimate(&PatientProfile::default())
            .expect("Should estimate");

        assert_eq!(result.estimator, EstimatorKind::Ensemble);
        assert!((0.0..=100.0).contains(&result.adherence_score));
        assert_eq!(result.confidence, ensemble_confidence(result.adherence_score));
        assert!(!result.adjusted);
    }

    #[test]
    fn test_bytes_round_trip() {
        let artifact = small_artifact();
        let stored = StoredArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            blob: artifact.to_bytes().expect("Should serialize"),
            checksum: String::new(),
            created_at: chrono::Utc::now(),
        };
        let restored = TrainedArtifact::from_stored(&stored).expect("Should deserialize");

        assert_eq!(restored.encoding_mode, artifact.encoding_mode);
        assert_eq!(restored.feature_names, artifact.feature_names);
        let profile = PatientProfile::default();
        assert_eq!(
            restored.score(&profile).expect("score"),
            artifact.score(&profile).expect("score")
        );
    }

    #[test]
    fn test_rejects_unknown_schema() {
        let artifact = small_artifact();
        let stored = StoredArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION + 1,
            blob: artifact.to_bytes().expect("Should serialize"),
            checksum: String::new(),
            created_at: chrono::Utc::now(),
        };
        assert!(matches!(
            TrainedArtifact::from_stored(&stored),
            Err(StorageError::UnsupportedSchema { found: 2, expected: 1 })
        ));
    }

    #[test]
    fn test_rejects_inconsistent_layout() {
        let mut artifact = small_artifact();
        artifact.feature_names[2] = "bmi".to_string();
        let stored = StoredArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            blob: artifact.to_bytes().expect("Should serialize"),
            checksum: String::new(),
            created_at: chrono::Utc::now(),
        };
        assert!(matches!(
            TrainedArtifact::from_stored(&stored),
            Err(StorageError::InconsistentArtifact(EncodingError::UnknownFeature(_)))
        ));
        assert!(artifact.score(&PatientProfile::default()).is_err());
    }

    #[test]
    fn test_scaler_width_must_match_order() {
        let mut artifact = small_artifact();
        artifact.check_layout().expect("Should be consistent after training");

        artifact.scaler = StandardScaler::fit(&[vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 4.0]]);
        assert_eq!(
            artifact.check_layout(),
            Err(EncodingError::LengthMismatch {
                expected: artifact.feature_names.len(),
                actual: 3
            })
        );
        assert!(matches!(
            artifact.score(&PatientProfile::default()),
            Err(EncodingError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_corrupt_blob() {
        let stored = StoredArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            blob: vec![1, 2, 3],
            checksum: String::new(),
            created_at: chrono::Utc::now(),
        };
        assert!(matches!(
            TrainedArtifact::from_stored(&stored),
            Err(StorageError::Serialization(_))
        ));
    }
}
