//! Ensemble training: split, scale, fit, evaluate, cross-validate.

use std::collections::BTreeMap;

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::boosting::{BoostingParams, GradientBoosting};
use super::forest::{ForestParams, RandomForest};
use super::metrics::{
    classification_report, kfold_indices, mean_squared_error, mean_std, r2_score, round_to,
};
use super::scaler::StandardScaler;
use super::{TrainedArtifact, ALGORITHM_LABEL, ARTIFACT_SCHEMA_VERSION};
use crate::domain::{default_feature_names, encode, TrainingDataset, TrainingError, TrainingMetrics};

/// Smallest dataset that still leaves a test split and five CV folds.
pub const MIN_TRAINING_SAMPLES: usize = 10;

/// Both true and predicted scores are binarized at this value for the
/// classification metrics.
pub const CLASSIFICATION_THRESHOLD: f64 = 70.0;

/// Training configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    pub cv_folds: usize,
    /// Seed of the train/test shuffle
    pub seed: u64,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self::with_seed(42)
    }
}

impl TrainerConfig {
    /// Production hyperparameters with every random stream seeded from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 5,
            seed,
            forest: ForestParams {
                seed,
                ..ForestParams::default()
            },
            boosting: BoostingParams {
                seed,
                ..BoostingParams::default()
            },
        }
    }

    /// Small ensembles for quick runs and tests.
    #[must_use]
    pub fn fast(seed: u64) -> Self {
        let base = Self::with_seed(seed);
        Self {
            forest: ForestParams {
                n_trees: 20,
                ..base.forest
            },
            boosting: BoostingParams {
                n_stages: 30,
                ..base.boosting
            },
            ..base
        }
    }
}

/// Fits the ensemble and produces a complete artifact.
#[derive(Debug, Clone, Default)]
pub struct EnsembleTrainer {
    config: TrainerConfig,
}

struct Fitted {
    forest: RandomForest,
    boosting: GradientBoosting,
}

impl Fitted {
    fn predict(&self, row: &[f64]) -> f64 {
        (self.forest.predict(row) + self.boosting.predict(row)) / 2.0
    }
}

fn select<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

impl EnsembleTrainer {
    #[must_use]
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Fitted {
        let (forest, boosting) = rayon::join(
            || RandomForest::fit(x, y, &self.config.forest),
            || GradientBoosting::fit(x, y, &self.config.boosting),
        );
        Fitted { forest, boosting }
    }

    /// Train on `dataset`.
    ///
    /// Nothing is persisted here; the caller stores the artifact and swaps
    /// it in only when this returns `Ok`.
    ///
    /// # Errors
    /// Returns `TrainingError` for empty, too small or malformed datasets.
    pub fn train(&self, dataset: &TrainingDataset) -> Result<TrainedArtifact, TrainingError> {
        dataset.validate()?;
        let n = dataset.len();
        if n < MIN_TRAINING_SAMPLES {
            return Err(TrainingError::TooFewSamples {
                needed: MIN_TRAINING_SAMPLES,
                got: n,
            });
        }

        let mode = dataset.encoding_mode()?;
        let feature_names = default_feature_names(mode);

        let x: Vec<Vec<f64>> = dataset
            .samples
            .iter()
            .map(|s| {
                encode(&s.profile(), mode, Some(&feature_names))
                    .map(|v| v.values)
                    .map_err(|e| TrainingError::Fit(e.to_string()))
            })
            .collect::<Result<_, _>>()?;
        let y: Vec<f64> = dataset.samples.iter().map(|s| s.adherence_score).collect();

        // Shuffled hold-out split
        let n_test = ((n as f64) * self.config.test_fraction).ceil() as usize;
        let n_test = n_test.clamp(1, n - 1);
        let mut rng = ChaCha20Rng::seed_from_u64(self.config.seed);
        let permutation = index::sample(&mut rng, n, n).into_vec();
        let (test_idx, train_idx) = permutation.split_at(n_test);

        tracing::info!(
            "Training ensemble: {} train / {} test samples, encoding {}",
            train_idx.len(),
            test_idx.len(),
            mode
        );

        let scaler = StandardScaler::fit(&select(&x, train_idx));
        let x_train = scaler
            .transform_all(&select(&x, train_idx))
            .map_err(|e| TrainingError::Fit(e.to_string()))?;
        let x_test = scaler
            .transform_all(&select(&x, test_idx))
            .map_err(|e| TrainingError::Fit(e.to_string()))?;
        let y_train = select(&y, train_idx);
        let y_test = select(&y, test_idx);

        let fitted = self.fit(&x_train, &y_train);
        tracing::info!("Fitted forest and boosting models");

        let y_pred: Vec<f64> = x_test
            .iter()
            .map(|row| fitted.predict(row).clamp(0.0, 100.0))
            .collect();
        let mse = mean_squared_error(&y_test, &y_pred);
        let r2 = r2_score(&y_test, &y_pred);
        let report = classification_report(&y_test, &y_pred, CLASSIFICATION_THRESHOLD);

        let cv_scores: Vec<f64> = kfold_indices(x_train.len(), self.config.cv_folds)
            .into_iter()
            .map(|(fold_train, fold_test)| {
                let model =
                    self.fit(&select(&x_train, &fold_train), &select(&y_train, &fold_train));
                let truth = select(&y_train, &fold_test);
                let preds: Vec<f64> = fold_test
                    .iter()
                    .map(|&i| model.predict(&x_train[i]))
                    .collect();
                r2_score(&truth, &preds)
            })
            .collect();
        let (cv_mean, cv_std) = mean_std(&cv_scores);
        tracing::debug!("Cross-validation R2 per fold: {:?}", cv_scores);

        let feature_importance: BTreeMap<String, f64> = feature_names
            .iter()
            .cloned()
            .zip(fitted.forest.feature_importances())
            .collect();

        let metrics = TrainingMetrics {
            algorithm: ALGORITHM_LABEL.to_string(),
            mse: round_to(mse, 2),
            r2_score: round_to(r2, 4),
            cv_r2_mean: round_to(cv_mean, 4),
            cv_r2_std: round_to(cv_std, 4),
            accuracy: round_to(report.accuracy, 4),
            precision: round_to(report.precision, 4),
            recall: round_to(report.recall, 4),
            f1_score: round_to(report.f1, 4),
            feature_importance: feature_importance.clone(),
            encoding_mode: mode,
            train_samples: train_idx.len(),
            test_samples: test_idx.len(),
        };

        tracing::info!(
            "Training complete: mse={:.2}, r2={:.4}, cv_r2={:.4}±{:.4}, f1={:.4}",
            metrics.mse,
            metrics.r2_score,
            metrics.cv_r2_mean,
            metrics.cv_r2_std,
            metrics.f1_score
        );

        Ok(TrainedArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            encoding_mode: mode,
            feature_names,
            scaler,
            forest: fitted.forest,
            boosting: fitted.boosting,
            feature_importance,
            metrics,
            trained_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::synthesizer::{generate, SynthesizerConfig};
    use crate::domain::{EncodingMode, LabeledSample};
    use approx::assert_abs_diff_eq;

    fn dataset(samples: usize, include_gender: bool) -> TrainingDataset {
        generate(&SynthesizerConfig {
            samples,
            seed: 42,
            include_gender,
        })
    }

    #[test]
    fn test_train_one_hot_dataset() {
        let artifact = EnsembleTrainer::new(TrainerConfig::fast(42))
            .train(&dataset(300, true))
            .expect("Should train");
        let metrics = &artifact.metrics;

        assert_eq!(artifact.encoding_mode, EncodingMode::OneHotGender);
        assert_eq!(artifact.feature_names.len(), 11);
        assert_eq!(metrics.algorithm, ALGORITHM_LABEL);
        assert_eq!(metrics.test_samples, 60);
        assert_eq!(metrics.train_samples, 240);
        assert!(metrics.mse >= 0.0);
        assert!(metrics.r2_score > 0.0, "r2 = {}", metrics.r2_score);
        for ratio in [metrics.accuracy, metrics.precision, metrics.recall, metrics.f1_score] {
            assert!((0.0..=1.0).contains(&ratio));
        }
        assert_abs_diff_eq!(
            metrics.feature_importance.values().sum::<f64>(),
            1.0,
            epsilon = 1e-9
        );
        assert!(metrics.feature_importance.contains_key("gender_2"));
    }

    #[test]
    fn test_train_simple_dataset() {
        let artifact = EnsembleTrainer::new(TrainerConfig::fast(42))
            .train(&dataset(100, false))
            .expect("Should train");
        assert_eq!(artifact.encoding_mode, EncodingMode::Simple);
        assert_eq!(artifact.feature_names.len(), 9);
    }

    #[test]
    fn test_training_is_reproducible() {
        let data = dataset(80, true);
        let trainer = EnsembleTrainer::new(TrainerConfig::fast(9));
        let a = trainer.train(&data).expect("Should train");
        let b = trainer.train(&data).expect("Should train");

        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.forest, b.forest);
        assert_eq!(a.boosting, b.boosting);
    }

    #[test]
    fn test_rejects_bad_datasets() {
        let trainer = EnsembleTrainer::new(TrainerConfig::fast(1));
        assert_eq!(
            trainer.train(&TrainingDataset::default()).map(|_| ()),
            Err(TrainingError::EmptyDataset)
        );
        assert_eq!(
            trainer.train(&dataset(5, true)).map(|_| ()),
            Err(TrainingError::TooFewSamples { needed: 10, got: 5 })
        );

        let mut mixed = dataset(20, true);
        mixed.samples[0] = LabeledSample {
            gender: None,
            ..mixed.samples[0].clone()
        };
        assert_eq!(
            trainer.train(&mixed).map(|_| ()),
            Err(TrainingError::MixedGenderColumn)
        );
    }
}
