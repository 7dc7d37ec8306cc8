//! Training service: fit, persist and swap the ensemble artifact.
//!
//! A run either completes every step (train, serialize, save, install) or
//! leaves both the stored and the installed artifact as they were.
//! Fitting runs concurrently; saving and installing happen under one lock
//! so the stored and the installed artifact are always the same one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::adapters::ensemble::{EnsembleTrainer, TrainedArtifact, TrainerConfig};
use crate::domain::{TrainingDataset, TrainingMetrics};
use crate::ports::Storage;
use crate::AdherewiseError;

use super::model::{ArtifactStatus, ModelHandle};
use super::synthesizer::{generate, SynthesizerConfig};

/// Service for training and loading the ensemble artifact.
pub struct TrainingService<S>
where
    S: Storage,
{
    storage: Arc<S>,
    model: Arc<ModelHandle>,
    trainer: EnsembleTrainer,
    commit: Mutex<()>,
}

impl<S> TrainingService<S>
where
    S: Storage,
    S::Error: Into<crate::adapters::StorageError>,
{
    /// Create a new training service.
    pub fn new(storage: Arc<S>, model: Arc<ModelHandle>, config: TrainerConfig) -> Self {
        Self {
            storage,
            model,
            trainer: EnsembleTrainer::new(config),
            commit: Mutex::new(()),
        }
    }

    /// Single-writer lock for the stored and the installed artifact.
    fn lock_commit(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install the stored artifact, if a usable one exists.
    ///
    /// A missing, corrupt or incompatible artifact is not an error: the
    /// handle is left empty with the reason recorded, and predictions use
    /// the rule-based estimator.
    pub fn load_from_storage(&self) -> ArtifactStatus {
        let stored = match self.storage.load_artifact() {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                tracing::info!("No stored model artifact; using rule-based estimator");
                self.model.clear("no model has been trained");
                return self.model.status();
            }
            Err(e) => {
                let e: crate::adapters::StorageError = e.into();
                tracing::warn!("Failed to load model artifact: {e}; using rule-based estimator");
                self.model.clear(format!("stored artifact unreadable: {e}"));
                return self.model.status();
            }
        };

        match TrainedArtifact::from_stored(&stored) {
            Ok(artifact) => {
                tracing::info!(
                    "Loaded model artifact trained at {} ({} features)",
                    artifact.trained_at,
                    artifact.feature_names.len()
                );
                self.model.install(artifact);
            }
            Err(e) => {
                tracing::warn!("Stored model artifact rejected: {e}; using rule-based estimator");
                self.model.clear(format!("stored artifact rejected: {e}"));
            }
        }
        self.model.status()
    }

    /// Train on `dataset`, persist the result and make it active.
    ///
    /// # Errors
    /// Returns `Training` if fitting fails and `Storage` if the artifact
    /// cannot be serialized or saved. In both cases the previous artifact
    /// stays active.
    pub fn train(&self, dataset: &TrainingDataset) -> Result<TrainingMetrics, AdherewiseError> {
        let artifact = self.trainer.train(dataset)?;
        let bytes = artifact.to_bytes()?;

        let _commit = self.lock_commit();
        self.storage
            .save_artifact(artifact.schema_version, &bytes)
            .map_err(|e| AdherewiseError::Storage(e.into()))?;

        let metrics = artifact.metrics.clone();
        self.model.install(artifact);
        tracing::info!("Installed new model artifact ({} bytes)", bytes.len());
        Ok(metrics)
    }

    /// Generate a synthetic dataset and train on it.
    ///
    /// # Errors
    /// See [`TrainingService::train`].
    pub fn train_synthetic(
        &self,
        config: &SynthesizerConfig,
    ) -> Result<TrainingMetrics, AdherewiseError> {
        self.train(&generate(config))
    }

    #[must_use]
    pub fn status(&self) -> ArtifactStatus {
        self.model.status()
    }

    /// Drop the stored and the installed artifact.
    ///
    /// # Errors
    /// Returns error if the stored artifact cannot be deleted.
    pub fn reset(&self) -> Result<(), AdherewiseError> {
        let _commit = self.lock_commit();
        self.storage
            .delete_artifact()
            .map_err(|e| AdherewiseError::Storage(e.into()))?;
        self.model.clear("model was reset");
        Ok(())
    }
}
