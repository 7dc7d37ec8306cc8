//! Shared slot for the active trained artifact.
//!
//! Readers take a cheap `Arc` clone under a short read lock and predict
//! without holding it. Training replaces the `Arc` under a short write lock.

use std::sync::{Arc, RwLock};

use crate::adapters::ensemble::TrainedArtifact;
use crate::domain::TrainingMetrics;

/// Whether a trained artifact is installed.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactStatus {
    Loaded {
        trained_at: chrono::DateTime<chrono::Utc>,
        metrics: TrainingMetrics,
    },
    /// Predictions fall back to the rule-based estimator
    Unavailable { reason: String },
}

impl ArtifactStatus {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Single-writer/multi-reader handle to the active artifact.
#[derive(Debug)]
pub struct ModelHandle {
    current: RwLock<Option<Arc<TrainedArtifact>>>,
    unavailable_reason: RwLock<String>,
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::empty("no model has been trained")
    }
}

impl ModelHandle {
    /// A handle with no artifact installed.
    #[must_use]
    pub fn empty(reason: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(None),
            unavailable_reason: RwLock::new(reason.into()),
        }
    }

    /// A handle with `artifact` installed.
    #[must_use]
    pub fn with_artifact(artifact: TrainedArtifact) -> Self {
        let handle = Self::default();
        handle.install(artifact);
        handle
    }

    /// The installed artifact, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<TrainedArtifact>> {
        // A poisoned lock still guards a complete Option<Arc<_>>
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Atomically replace the installed artifact.
    pub fn install(&self, artifact: TrainedArtifact) {
        let next = Arc::new(artifact);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(next);
    }

    /// Remove the installed artifact, recording why.
    pub fn clear(&self, reason: impl Into<String>) {
        {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            *guard = None;
        }
        let mut why = self
            .unavailable_reason
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *why = reason.into();
    }

    #[must_use]
    pub fn status(&self) -> ArtifactStatus {
        match self.current() {
            Some(artifact) => ArtifactStatus::Loaded {
                trained_at: artifact.trained_at,
                metrics: artifact.metrics.clone(),
            },
            None => ArtifactStatus::Unavailable {
                reason: self
                    .unavailable_reason
                    .read()
                    .unwrap_or_else(|e| e.into_inner())
                    .clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ensemble::{EnsembleTrainer, TrainerConfig};
    use crate::application::synthesizer::{generate, SynthesizerConfig};

    fn artifact(seed: u64) -> TrainedArtifact {
        let data = generate(&SynthesizerConfig {
            samples: 40,
            seed,
            include_gender: true,
        });
        EnsembleTrainer::new(TrainerConfig::fast(seed))
            .train(&data)
            .expect("Should train")
    }

    #[test]
    fn test_empty_handle_reports_reason() {
        let handle = ModelHandle::empty("artifact missing");
        assert!(handle.current().is_none());
        assert_eq!(
            handle.status(),
            ArtifactStatus::Unavailable {
                reason: "artifact missing".to_string()
            }
        );
    }

    #[test]
    fn test_swap_keeps_old_readers_consistent() {
        let handle = ModelHandle::with_artifact(artifact(1));
        let before = handle.current().expect("Should be installed");

        handle.install(artifact(2));
        let after = handle.current().expect("Should be installed");

        // A reader holding the old Arc keeps a complete artifact
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.feature_names.len(), 11);
        assert!(handle.status().is_loaded());

        handle.clear("reset");
        assert!(!handle.status().is_loaded());
    }

    #[test]
    fn test_concurrent_readers_during_swap() {
        let handle = Arc::new(ModelHandle::with_artifact(artifact(3)));
        let replacement = artifact(4);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let handle = Arc::clone(&handle);
                scope.spawn(move || {
                    for _ in 0..100 {
                        let current = handle.current().expect("Always installed");
                        assert_eq!(current.feature_names.len(), 11);
                    }
                });
            }
            handle.install(replacement);
        });

        assert!(handle.status().is_loaded());
    }
}
