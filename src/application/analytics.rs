//! Analytics service: aggregate statistics over assessment history.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{Assessment, EstimatorKind, RiskLevel};
use crate::ports::Storage;
use crate::AdherewiseError;

/// Aggregates over the most recent assessments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentOverview {
    /// All assessments ever recorded
    pub total_recorded: usize,
    /// Assessments the aggregates below were computed over
    pub sampled: usize,
    pub low_risk: usize,
    pub medium_risk: usize,
    pub high_risk: usize,
    /// Rounded to two decimals; 0 when nothing was sampled
    pub mean_score: f64,
    pub mean_confidence: f64,
    pub ensemble_share: f64,
    pub adjusted_share: f64,
}

impl AssessmentOverview {
    fn from_assessments(assessments: &[Assessment], total_recorded: usize) -> Self {
        let n = assessments.len();
        if n == 0 {
            return Self {
                total_recorded,
                ..Self::default()
            };
        }

        let count = |level: RiskLevel| {
            assessments
                .iter()
                .filter(|a| a.risk_level == level)
                .count()
        };
        let share = |hits: usize| round2(hits as f64 / n as f64);
        let mean =
            |f: fn(&Assessment) -> f64| round2(assessments.iter().map(f).sum::<f64>() / n as f64);

        Self {
            total_recorded,
            sampled: n,
            low_risk: count(RiskLevel::Low),
            medium_risk: count(RiskLevel::Medium),
            high_risk: count(RiskLevel::High),
            mean_score: mean(|a| a.adherence_score),
            mean_confidence: mean(|a| a.confidence),
            ensemble_share: share(
                assessments
                    .iter()
                    .filter(|a| a.estimator == EstimatorKind::Ensemble)
                    .count(),
            ),
            adjusted_share: share(assessments.iter().filter(|a| a.adjusted).count()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Service for assessment statistics.
pub struct AnalyticsService<S>
where
    S: Storage,
{
    storage: Arc<S>,
}

impl<S> AnalyticsService<S>
where
    S: Storage,
    S::Error: Into<crate::adapters::StorageError>,
{
    /// Create a new analytics service.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Aggregate the `limit` most recent assessments.
    ///
    /// # Errors
    /// Returns error if storage fails.
    pub fn overview(&self, limit: usize) -> Result<AssessmentOverview, AdherewiseError> {
        let total = self
            .storage
            .count_assessments()
            .map_err(|e| AdherewiseError::Storage(e.into()))?;
        let recent = self
            .storage
            .load_recent_assessments(limit)
            .map_err(|e| AdherewiseError::Storage(e.into()))?;

        let overview = AssessmentOverview::from_assessments(&recent, total);
        tracing::info!(
            "Assessment overview: {} of {} sampled, mean score {:.2}, {} high risk",
            overview.sampled,
            overview.total_recorded,
            overview.mean_score,
            overview.high_risk
        );
        Ok(overview)
    }
}
