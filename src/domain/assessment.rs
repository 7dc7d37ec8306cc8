//! Stored assessment history.
//!
//! Each completed prediction can be recorded for later aggregate reporting.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::prediction::{EstimatorKind, PredictionResult, RiskLevel};

/// A persisted summary of one prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier
    pub id: String,

    /// Reference to patient (if available)
    pub patient_id: Option<String>,

    pub adherence_score: f64,

    pub confidence: f64,

    pub risk_level: RiskLevel,

    pub estimator: EstimatorKind,

    /// Whether a medicine adjustment was applied
    pub adjusted: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Assessment {
    /// Record a prediction result.
    #[must_use]
    pub fn from_result(result: &PredictionResult) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            patient_id: None,
            adherence_score: result.adherence_score,
            confidence: result.confidence,
            risk_level: result.risk_level,
            estimator: result.estimator,
            adjusted: result.adjusted,
            created_at: chrono::Utc::now(),
        }
    }

    /// Record a prediction result for a known patient.
    #[must_use]
    pub fn with_patient(result: &PredictionResult, patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            ..Self::from_result(result)
        }
    }
}
