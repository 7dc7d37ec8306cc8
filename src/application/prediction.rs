//! Prediction service: base estimate, medicine adjustment, history.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapters::rules::RuleBasedEstimator;
use crate::domain::{
    Assessment, EstimatorKind, MedicineEntry, PatientInput, PatientProfile, PredictionResult,
};
use crate::ports::{AdherenceEstimator, InteractionLookup, Storage};
use crate::AdherewiseError;

use super::adjuster::MedicineImpactAdjuster;
use super::model::ModelHandle;

/// One prediction request: patient fields plus an optional medicine list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(flatten)]
    pub patient: PatientInput,

    #[serde(default)]
    pub medicines: Vec<MedicineEntry>,

    /// Recorded with the assessment when present
    #[serde(default)]
    pub patient_id: Option<String>,
}

/// Service for scoring patients.
///
/// Uses the installed ensemble artifact when there is one and the
/// rule-based estimator otherwise.
pub struct PredictionService<I, S>
where
    I: InteractionLookup,
    S: Storage,
{
    model: Arc<ModelHandle>,
    rules: RuleBasedEstimator,
    adjuster: MedicineImpactAdjuster<I>,
    storage: Arc<S>,
}

impl<I, S> PredictionService<I, S>
where
    I: InteractionLookup,
    S: Storage,
    S::Error: Into<crate::adapters::StorageError>,
{
    /// Create a new prediction service.
    pub fn new(model: Arc<ModelHandle>, interactions: Arc<I>, storage: Arc<S>) -> Self {
        Self {
            model,
            rules: RuleBasedEstimator::new(),
            adjuster: MedicineImpactAdjuster::new(interactions),
            storage,
        }
    }

    /// Which estimator the next prediction will use.
    #[must_use]
    pub fn active_estimator(&self) -> EstimatorKind {
        match self.model.current() {
            Some(artifact) => artifact.kind(),
            None => self.rules.kind(),
        }
    }

    /// Unadjusted prediction from the active estimator.
    ///
    /// # Errors
    /// Returns `Encoding` if the installed artifact cannot encode the
    /// profile. The rule-based path never fails.
    pub fn estimate(&self, profile: &PatientProfile) -> Result<PredictionResult, AdherewiseError> {
        match self.model.current() {
            Some(artifact) => artifact.estimate(profile),
            None => {
                tracing::debug!("No model artifact installed; using rule-based estimator");
                Ok(self.rules.predict(profile))
            }
        }
    }

    /// Base prediction, adjusted for `medicines` when the list is not
    /// empty after normalization.
    ///
    /// # Errors
    /// See [`PredictionService::estimate`].
    pub fn predict(
        &self,
        profile: &PatientProfile,
        medicines: &[MedicineEntry],
    ) -> Result<PredictionResult, AdherewiseError> {
        let base = self.estimate(profile)?;

        let normalized = crate::domain::normalize_medicines(medicines);
        if normalized.is_empty() {
            return Ok(base);
        }

        let adj = self.adjuster.adjust_medicines(&normalized);
        Ok(base.with_adjustment(
            adj.score_delta,
            adj.confidence_delta,
            adj.recommendations,
            adj.factors,
        ))
    }

    /// Validate a raw request, predict and record the assessment.
    ///
    /// A failure to record history is logged and does not fail the
    /// prediction.
    ///
    /// # Errors
    /// Returns `Validation` listing every invalid field, or an encoding
    /// error from the ensemble path.
    pub fn handle(&self, request: &PredictionRequest) -> Result<PredictionResult, AdherewiseError> {
        let profile = request
            .patient
            .validate()
            .map_err(|errors| AdherewiseError::Validation(errors.join("; ")))?;

        let result = self.predict(&profile, &request.medicines)?;

        let assessment = match &request.patient_id {
            Some(id) => Assessment::with_patient(&result, id.as_str()),
            None => Assessment::from_result(&result),
        };
        if let Err(e) = self.storage.save_assessment(&assessment) {
            let e: crate::adapters::StorageError = e.into();
            tracing::warn!("Failed to record assessment {}: {e}", assessment.id);
        }

        tracing::debug!(
            "Prediction: score={:.2}, risk={}, confidence={:.1}, estimator={}, adjusted={}",
            result.adherence_score,
            result.risk_level,
            result.confidence,
            result.estimator,
            result.adjusted
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ensemble::{EnsembleTrainer, TrainerConfig};
    use crate::adapters::sqlite::SqliteStorage;
    use crate::application::synthesizer::{generate, SynthesizerConfig};
    use crate::domain::{EncodingError, Gender, RiskLevel};

    fn create_test_service() -> (
        PredictionService<SqliteStorage, SqliteStorage>,
        Arc<ModelHandle>,
        Arc<SqliteStorage>,
    ) {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        storage
            .import_interaction("Warfarin", "Ibuprofen", "Risk of severe bleeding")
            .expect("Should import");
        let model = Arc::new(ModelHandle::default());
        let service =
            PredictionService::new(Arc::clone(&model), Arc::clone(&storage), Arc::clone(&storage));
        (service, model, storage)
    }

    /// Rule-based score 70 (medium risk).
    fn profile() -> PatientProfile {
        PatientProfile {
            age: 50,
            gender: Gender::Female,
            medication_count: 2,
            dosage_frequency: 2,
            reminder_enabled: false,
            missed_doses_last_month: 1,
            comorbidities: 1,
            side_effects: false,
            cost_concern: 2,
        }
    }

    fn meds(names: &[&str]) -> Vec<MedicineEntry> {
        names.iter().copied().map(MedicineEntry::from).collect()
    }

    #[test]
    fn test_falls_back_to_rules_without_artifact() {
        let (service, _, _) = create_test_service();
        assert_eq!(service.active_estimator(), EstimatorKind::RuleBased);

        let result = service.predict(&profile(), &[]).expect("Should predict");
        assert_eq!(result.estimator, EstimatorKind::RuleBased);
        assert_eq!(result.adherence_score, 70.0);
        assert_eq!(result.confidence, 75.0);
        assert!(!result.adjusted);
    }

    #[test]
    fn test_blank_medicine_list_is_not_adjusted() {
        let (service, _, _) = create_test_service();
        let result = service
            .predict(&profile(), &meds(&["  ", ""]))
            .expect("Should predict");
        assert!(!result.adjusted);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn test_adjustment_reclassifies_risk() {
        let (service, _, _) = create_test_service();
        let base = service.predict(&profile(), &[]).expect("Should predict");

        let result = service
            .predict(
                &profile(),
                &meds(&["Warfarin", "Ibuprofen", "Paracetamol", "Omeprazole", "Cetirizine"]),
            )
            .expect("Should predict");

        // Polypharmacy -8, one high interaction -6, warfarin complex dosing -3
        assert_eq!(result.adherence_score, 70.0 - 8.0 - 6.0 - 3.0);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.confidence, (75.0_f64 - 5.0 - 8.0).max(50.0));
        assert!(result.adjusted);
        assert_eq!(
            &result.recommendations[..base.recommendations.len()],
            &base.recommendations[..]
        );

        // Synthesized from the raw score of 70, so no support program at 53
        let titles: Vec<&str> = result
            .recommendations
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "Enable Medication Reminders",
                "Medication Review",
                "Dangerous Drug Interactions",
                "Complex Dosing Support",
            ]
        );
        assert!(!result.factors.is_empty());
    }

    #[test]
    fn test_uses_installed_artifact() {
        let (service, model, _) = create_test_service();
        let data = generate(&SynthesizerConfig {
            samples: 80,
            ..SynthesizerConfig::default()
        });
        let artifact = EnsembleTrainer::new(TrainerConfig::fast(5))
            .train(&data)
            .expect("Should train");
        model.install(artifact);

        assert_eq!(service.active_estimator(), EstimatorKind::Ensemble);
        let result = service.predict(&profile(), &[]).expect("Should predict");
        assert_eq!(result.estimator, EstimatorKind::Ensemble);
        assert!((0.0..=100.0).contains(&result.adherence_score));
        assert!(result.confidence <= 95.0);
    }

    #[test]
    fn test_encoding_mismatch_is_an_error() {
        let (service, model, _) = create_test_service();
        let data = generate(&SynthesizerConfig {
            samples: 40,
            ..SynthesizerConfig::default()
        });
        let mut artifact = EnsembleTrainer::new(TrainerConfig::fast(5))
            .train(&data)
            .expect("Should train");
        let renamed = artifact.feature_names.len() - 1;
        artifact.feature_names[renamed] = "bmi".to_string();
        model.install(artifact.clone());

        let result = service.predict(&profile(), &[]);
        assert!(matches!(result, Err(AdherewiseError::Encoding(_))));

        artifact.feature_names.pop();
        model.install(artifact);
        let result = service.predict(&profile(), &[]);
        assert!(matches!(
            result,
            Err(AdherewiseError::Encoding(EncodingError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_handle_validates_and_records() {
        let (service, _, storage) = create_test_service();

        let request: PredictionRequest = serde_json::from_str(
            r#"{"age": 40, "gender": "male", "reminder_enabled": true,
                "medicines": ["Aspirin", {"name": "Vitamin D"}], "patient_id": "p-1"}"#,
        )
        .expect("Should parse");
        let result = service.handle(&request).expect("Should predict");
        assert!(result.adjusted);

        let history = storage.load_recent_assessments(10).expect("Should load");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].patient_id.as_deref(), Some("p-1"));
        assert_eq!(history[0].adherence_score, result.adherence_score);

        let invalid = PredictionRequest {
            patient: PatientInput {
                age: -1,
                cost_concern: 9,
                ..PatientInput::default()
            },
            ..PredictionRequest::default()
        };
        match service.handle(&invalid) {
            Err(AdherewiseError::Validation(msg)) => {
                assert!(msg.contains("age"));
                assert!(msg.contains("cost_concern"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(storage.count_assessments().expect("Should count"), 1);
    }
}
