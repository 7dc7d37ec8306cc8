//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod adjuster;
mod analytics;
mod interactions;
mod model;
mod prediction;
pub mod synthesizer;
mod training;

pub use adjuster::MedicineImpactAdjuster;
pub use analytics::{AnalyticsService, AssessmentOverview};
pub use interactions::{pairwise, InteractionService};
pub use model::{ArtifactStatus, ModelHandle};
pub use prediction::{PredictionRequest, PredictionService};
pub use training::TrainingService;
