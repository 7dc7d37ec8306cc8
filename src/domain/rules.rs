//! Deterministic rule-based adherence score.
//!
//! Used whenever no trained model is installed. Never fails.

use super::patient::PatientProfile;

/// Starting score before any adjustment.
pub const BASE_SCORE: f64 = 100.0;

/// Fixed confidence reported by the rule-based estimator.
pub const RULE_BASED_CONFIDENCE: f64 = 75.0;

/// Unclamped additive score. Exposed for diagnostics and tests.
#[must_use]
pub fn raw_score(profile: &PatientProfile) -> f64 {
    let mut score = BASE_SCORE;

    if profile.age > 70 {
        score -= 10.0;
    } else if profile.age < 30 {
        score -= 5.0;
    }

    score -= f64::from(profile.medication_count) * 3.0;
    score -= f64::from(profile.dosage_frequency) * 2.0;
    score -= f64::from(profile.missed_doses_last_month) * 5.0;

    if profile.reminder_enabled {
        score += 15.0;
    }

    score -= f64::from(profile.comorbidities) * 5.0;
    if profile.side_effects {
        score -= 10.0;
    }
    score -= f64::from(profile.cost_concern) * 5.0;

    score
}

/// Rule-based score clamped to [0, 100].
#[must_use]
pub fn score(profile: &PatientProfile) -> f64 {
    raw_score(profile).clamp(0.0, 100.0)
}
