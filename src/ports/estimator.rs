//! Estimator port: anything that turns a patient profile into a base
//! prediction.

use crate::domain::{EstimatorKind, PatientProfile, PredictionResult};

/// Trait for adherence estimators.
///
/// Implementations produce an unadjusted `PredictionResult`: score,
/// confidence, risk tier and the synthesized recommendations. The medicine
/// adjustment is applied afterwards by the application layer.
pub trait AdherenceEstimator: Send + Sync {
    /// Which estimator this is, reported on every result.
    fn kind(&self) -> EstimatorKind;

    /// Score one patient.
    ///
    /// # Errors
    /// Returns `AdherewiseError::Encoding` if the profile cannot be encoded
    /// in the layout the estimator was fit with.
    fn estimate(&self, profile: &PatientProfile) -> crate::Result<PredictionResult>;
}
