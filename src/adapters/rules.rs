//! Rule-based estimator: the always-available fallback.

use crate::domain::{
    recommendations, rules, EstimatorKind, PatientProfile, PredictionResult,
};
use crate::ports::AdherenceEstimator;

/// Deterministic additive scoring with a fixed confidence of 75.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedEstimator;

impl RuleBasedEstimator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Infallible variant of [`AdherenceEstimator::estimate`].
    #[must_use]
    pub fn predict(&self, profile: &PatientProfile) -> PredictionResult {
        let score = rules::score(profile);
        PredictionResult::new(
            score,
            rules::RULE_BASED_CONFIDENCE,
            recommendations::synthesize(profile, score),
            EstimatorKind::RuleBased,
        )
    }
}

impl AdherenceEstimator for RuleBasedEstimator {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::RuleBased
    }

    fn estimate(&self, profile: &PatientProfile) -> crate::Result<PredictionResult> {
        Ok(self.predict(profile))
    }
}
