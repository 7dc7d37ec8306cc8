//! Personalized recommendations derived from the raw profile and score.

use super::patient::PatientProfile;
use super::prediction::{Priority, Recommendation, MEDIUM_RISK_THRESHOLD};

/// Evaluate every trigger in a fixed order and emit one recommendation per
/// trigger that fires. The order is clinically meaningful and is never
/// re-sorted by priority.
#[must_use]
pub fn synthesize(profile: &PatientProfile, score: f64) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !profile.reminder_enabled {
        recommendations.push(Recommendation::new(
            "Enable Medication Reminders",
            "Set up daily reminders to improve adherence by 20-30%",
            Priority::High,
        ));
    }

    if profile.missed_doses_last_month > 5 {
        recommendations.push(Recommendation::new(
            "Schedule Follow-up Consultation",
            "Frequent missed doses detected. Consult with healthcare provider.",
            Priority::High,
        ));
    }

    if profile.medication_count > 5 {
        recommendations.push(Recommendation::new(
            "Medication Review",
            "Consider simplifying medication regimen with your doctor",
            Priority::Medium,
        ));
    }

    if profile.side_effects {
        recommendations.push(Recommendation::new(
            "Discuss Side Effects",
            "Report side effects to your doctor for possible alternatives",
            Priority::High,
        ));
    }

    if profile.cost_concern > 3 {
        recommendations.push(Recommendation::new(
            "Financial Assistance",
            "Explore generic alternatives or patient assistance programs",
            Priority::Medium,
        ));
    }

    if profile.dosage_frequency > 3 {
        recommendations.push(Recommendation::new(
            "Simplify Dosage Schedule",
            "Ask about extended-release formulations for fewer daily doses",
            Priority::Medium,
        ));
    }

    if score < MEDIUM_RISK_THRESHOLD {
        recommendations.push(Recommendation::new(
            "Adherence Support Program",
            "Enroll in a medication adherence support program",
            Priority::High,
        ));
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Gender;

    #[test]
    fn test_no_triggers() {
        let profile = PatientProfile {
            age: 40,
            gender: Gender::Male,
            medication_count: 2,
            dosage_frequency: 1,
            reminder_enabled: true,
            missed_doses_last_month: 0,
            comorbidities: 0,
            side_effects: false,
            cost_concern: 1,
        };
        assert!(synthesize(&profile, 95.0).is_empty());
    }

    #[test]
    fn test_all_triggers_in_fixed_order() {
        let profile = PatientProfile {
            age: 75,
            gender: Gender::Other,
            medication_count: 6,
            dosage_frequency: 4,
            reminder_enabled: false,
            missed_doses_last_month: 8,
            comorbidities: 3,
            side_effects: true,
            cost_concern: 5,
        };

        let titles: Vec<String> = synthesize(&profile, 0.0)
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(
            titles,
            vec![
                "Enable Medication Reminders",
                "Schedule Follow-up Consultation",
                "Medication Review",
                "Discuss Side Effects",
                "Financial Assistance",
                "Simplify Dosage Schedule",
                "Adherence Support Program",
            ]
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let profile = PatientProfile {
            reminder_enabled: true,
            missed_doses_last_month: 5,
            medication_count: 5,
            cost_concern: 3,
            dosage_frequency: 3,
            ..PatientProfile::default()
        };
        assert!(synthesize(&profile, 60.0).is_empty());

        let low = synthesize(&profile, 59.9);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].priority, Priority::High);
    }
}
