//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types and pure functions with no I/O.
//! All types are serializable; patient input is validated at the boundary.

mod assessment;
mod dataset;
mod features;
mod interaction;
mod medicine;
mod patient;
mod prediction;
pub mod prescription;
pub mod recommendations;
pub mod rules;

pub use assessment::Assessment;
pub use dataset::{
    LabeledSample, TrainingDataset, TrainingError, TrainingMetrics, ADHERENT_THRESHOLD,
};
pub use features::{
    check_feature_order, default_feature_names, encode, EncodedFeatureVector, EncodingError,
    EncodingMode, ONE_HOT_FEATURE_NAMES, SIMPLE_FEATURE_NAMES,
};
pub use interaction::{
    classify_severity, DrugInteraction, InteractionRecord, InteractionSummary, Severity,
    HIGH_SEVERITY_KEYWORDS, MEDIUM_SEVERITY_KEYWORDS,
};
pub use medicine::{
    normalize_medicines, Medicine, MedicineAdjustment, MedicineEntry, MedicineInfo, MedicineStats,
    COMPLEX_DOSING_KEYWORDS, HIGH_ADHERENCE_KEYWORDS, MODERATE_ADHERENCE_KEYWORDS,
};
pub use patient::{Gender, PatientInput, PatientProfile};
pub use prediction::{
    classify, EstimatorKind, PredictionResult, Priority, Recommendation, RiskColor, RiskLevel,
    ADJUSTED_CONFIDENCE_MAX, ADJUSTED_CONFIDENCE_MIN, LOW_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
};
pub use prescription::{PrescriptionData, PrescriptionValidation, ProcessedPrescription};
