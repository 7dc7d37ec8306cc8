//! Medicine impact adjustment: regimen size, pairwise interactions and
//! per-medicine characteristics folded into a score/confidence delta.

use std::sync::Arc;

use crate::domain::{
    normalize_medicines, InteractionSummary, Medicine, MedicineAdjustment, MedicineEntry,
    Priority, Recommendation, COMPLEX_DOSING_KEYWORDS, HIGH_ADHERENCE_KEYWORDS,
    MODERATE_ADHERENCE_KEYWORDS,
};
use crate::ports::InteractionLookup;

use super::interactions::pairwise;

const POLYPHARMACY_COUNT: usize = 5;
const MULTI_DRUG_COUNT: usize = 3;

const HIGH_INTERACTION_SCORE: f64 = -6.0;
const HIGH_INTERACTION_CONFIDENCE: f64 = -8.0;
const MEDIUM_INTERACTION_SCORE: f64 = -3.0;
const MEDIUM_INTERACTION_CONFIDENCE: f64 = -4.0;
const LOW_INTERACTION_SCORE: f64 = -1.0;

/// Characteristic bucket of a medicine name. The first matching list wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Characteristic {
    ComplexDosing,
    ModerateAdherence,
    HighAdherence,
}

fn characteristic(name: &str) -> Option<Characteristic> {
    let lower = name.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if matches(&COMPLEX_DOSING_KEYWORDS) {
        Some(Characteristic::ComplexDosing)
    } else if matches(&MODERATE_ADHERENCE_KEYWORDS) {
        Some(Characteristic::ModerateAdherence)
    } else if matches(&HIGH_ADHERENCE_KEYWORDS) {
        Some(Characteristic::HighAdherence)
    } else {
        None
    }
}

/// Computes the adjustment a medicine list applies to a base prediction.
pub struct MedicineImpactAdjuster<I: InteractionLookup> {
    lookup: Arc<I>,
}

impl<I: InteractionLookup> MedicineImpactAdjuster<I> {
    pub fn new(lookup: Arc<I>) -> Self {
        Self { lookup }
    }

    /// Normalize `entries` and compute the adjustment.
    #[must_use]
    pub fn adjust(&self, entries: &[MedicineEntry]) -> MedicineAdjustment {
        self.adjust_medicines(&normalize_medicines(entries))
    }

    /// Compute the adjustment for already normalized medicines.
    ///
    /// Deterministic for a fixed lookup: the same list always yields the
    /// same deltas, factors and recommendations in the same order.
    #[must_use]
    pub fn adjust_medicines(&self, medicines: &[Medicine]) -> MedicineAdjustment {
        let mut adj = MedicineAdjustment::default();
        let count = medicines.len();

        regimen_burden(&mut adj, count);

        if count >= 2 {
            let names: Vec<String> = medicines.iter().map(|m| m.name.clone()).collect();
            let summary = InteractionSummary::from_records(pairwise(self.lookup.as_ref(), &names));
            interaction_burden(&mut adj, &summary);
            adj.interactions = summary;
        }

        characteristic_scan(&mut adj, medicines);

        match count {
            0 => {
                adj.factors
                    .push("No medicines listed; regimen impact unknown".to_string());
                adj.confidence_delta -= 10.0;
            }
            1 => {
                adj.score_delta += 5.0;
                adj.confidence_delta += 3.0;
                adj.factors
                    .push("Single-medicine regimen is easy to follow".to_string());
            }
            _ => {}
        }

        tracing::debug!(
            "Medicine adjustment for {} medicines: score {:+.1}, confidence {:+.1}, {} interactions",
            count,
            adj.score_delta,
            adj.confidence_delta,
            adj.interactions.total
        );
        adj
    }
}

fn regimen_burden(adj: &mut MedicineAdjustment, count: usize) {
    if count >= POLYPHARMACY_COUNT {
        adj.score_delta -= 8.0;
        adj.confidence_delta -= 5.0;
        adj.factors
            .push(format!("Polypharmacy: {count} medicines in the regimen"));
        adj.recommendations.push(Recommendation::new(
            "Medication Review",
            format!(
                "Taking {count} medicines raises the chance of missed doses. Ask your doctor or pharmacist whether the regimen can be simplified."
            ),
            Priority::High,
        ));
    } else if count >= MULTI_DRUG_COUNT {
        adj.score_delta -= 4.0;
        adj.confidence_delta -= 2.0;
        adj.factors
            .push(format!("Multiple medicines: {count} in the regimen"));
    }
}

fn interaction_burden(adj: &mut MedicineAdjustment, summary: &InteractionSummary) {
    if summary.high > 0 {
        adj.score_delta += HIGH_INTERACTION_SCORE * summary.high as f64;
        adj.confidence_delta += HIGH_INTERACTION_CONFIDENCE;
        adj.factors.push(format!(
            "{} high-severity drug interaction(s) found",
            summary.high
        ));
        adj.recommendations.push(Recommendation::new(
            "Dangerous Drug Interactions",
            "Some of your medicines interact dangerously. Contact your doctor before taking the next dose.",
            Priority::High,
        ));
    }

    if summary.medium > 0 {
        adj.score_delta += MEDIUM_INTERACTION_SCORE * summary.medium as f64;
        adj.confidence_delta += MEDIUM_INTERACTION_CONFIDENCE;
        adj.factors.push(format!(
            "{} moderate drug interaction(s) found",
            summary.medium
        ));
        adj.recommendations.push(Recommendation::new(
            "Monitor Drug Interactions",
            "Some of your medicines may change each other's effects. Watch for new symptoms and mention them at your next visit.",
            Priority::Medium,
        ));
    }

    if summary.low > 0 {
        adj.score_delta += LOW_INTERACTION_SCORE * summary.low as f64;
        adj.factors
            .push(format!("{} minor drug interaction(s) found", summary.low));
    }
}

fn characteristic_scan(adj: &mut MedicineAdjustment, medicines: &[Medicine]) {
    let mut complex = 0usize;
    let mut high_adherence = 0usize;

    for medicine in medicines {
        match characteristic(&medicine.name) {
            Some(Characteristic::ComplexDosing) => {
                complex += 1;
                adj.score_delta -= 3.0;
                adj.factors
                    .push(format!("{} requires complex dosing", medicine.name));
            }
            Some(Characteristic::ModerateAdherence) => {
                adj.score_delta -= 2.0;
                adj.factors.push(format!(
                    "{} is a long-term therapy often taken irregularly",
                    medicine.name
                ));
            }
            Some(Characteristic::HighAdherence) => {
                high_adherence += 1;
                adj.score_delta += 1.0;
            }
            None => {}
        }
    }

    if complex > 0 {
        adj.recommendations.push(Recommendation::new(
            "Complex Dosing Support",
            format!(
                "{complex} of your medicines need precise dosing or monitoring. Use a pill organizer and keep scheduled lab checks."
            ),
            Priority::High,
        ));
    }
    if high_adherence > 0 {
        adj.confidence_delta += 2.0;
        adj.factors.push(format!(
            "{high_adherence} medicine(s) usually taken reliably"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DrugInteraction, InteractionRecord, Severity};
    use std::collections::HashMap;

    /// In-memory lookup keyed by lowercase, order-independent pairs.
    #[derive(Default)]
    struct FixedLookup {
        pairs: HashMap<(String, String), String>,
    }

    impl FixedLookup {
        fn with(mut self, a: &str, b: &str, description: &str) -> Self {
            self.pairs
                .insert(key(a, b), description.to_string());
            self
        }
    }

    fn key(a: &str, b: &str) -> (String, String) {
        let (a, b) = (a.to_lowercase(), b.to_lowercase());
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    impl InteractionLookup for FixedLookup {
        fn lookup(&self, drug_a: &str, drug_b: &str) -> Option<InteractionRecord> {
            self.pairs
                .get(&key(drug_a, drug_b))
                .map(|d| InteractionRecord::new(drug_a, drug_b, d))
        }

        fn interactions_for(&self, _drug: &str) -> Vec<DrugInteraction> {
            Vec::new()
        }
    }

    fn adjuster(lookup: FixedLookup) -> MedicineImpactAdjuster<FixedLookup> {
        MedicineImpactAdjuster::new(Arc::new(lookup))
    }

    fn entries(names: &[&str]) -> Vec<MedicineEntry> {
        names.iter().copied().map(MedicineEntry::from).collect()
    }

    #[test]
    fn test_single_medicine_bonus() {
        let adj = adjuster(FixedLookup::default()).adjust(&entries(&["Paracetamol"]));
        assert_eq!(adj.score_delta, 5.0);
        assert_eq!(adj.confidence_delta, 3.0);
        assert!(adj.recommendations.is_empty());
        assert_eq!(adj.interactions, InteractionSummary::default());
        assert_eq!(adj.factors.len(), 1);
    }

    #[test]
    fn test_high_severity_pair() {
        let lookup = FixedLookup::default().with(
            "DrugA",
            "DrugB",
            "May cause severe hepatotoxic effects",
        );
        let adj = adjuster(lookup).adjust(&entries(&["DrugA", "drugb"]));

        assert_eq!(adj.interactions.total, 1);
        assert_eq!(adj.interactions.high, 1);
        assert_eq!(adj.interactions.interactions[0].severity, Severity::High);
        assert_eq!(adj.score_delta, -6.0);
        assert_eq!(adj.confidence_delta, -8.0);
        assert_eq!(adj.recommendations.len(), 1);
        assert_eq!(adj.recommendations[0].priority, Priority::High);
    }

    #[test]
    fn test_confidence_penalty_is_flat_per_bucket() {
        let lookup = FixedLookup::default()
            .with("A", "B", "Toxic combination")
            .with("A", "C", "Fatal arrhythmia")
            .with("B", "C", "Increased drowsiness")
            .with("B", "D", "Unusual taste");
        let adj = adjuster(lookup).adjust(&entries(&["A", "B", "C", "D"]));

        assert_eq!(adj.interactions.high, 2);
        assert_eq!(adj.interactions.medium, 1);
        assert_eq!(adj.interactions.low, 1);
        // Multi-drug -4, high 2 x -6, medium -3, low -1
        assert_eq!(adj.score_delta, -4.0 - 12.0 - 3.0 - 1.0);
        assert_eq!(adj.confidence_delta, -2.0 - 8.0 - 4.0);
        let priorities: Vec<Priority> = adj.recommendations.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium]);
    }

    #[test]
    fn test_polypharmacy_and_characteristics() {
        let adj = adjuster(FixedLookup::default()).adjust(&entries(&[
            "Insulin Glargine",
            "Warfarin",
            "Atorvastatin",
            "Vitamin D",
            "Omeprazole",
        ]));

        // Polypharmacy -8, two complex -6, one statin -2, one vitamin +1
        assert_eq!(adj.score_delta, -8.0 - 6.0 - 2.0 + 1.0);
        assert_eq!(adj.confidence_delta, -5.0 + 2.0);
        let titles: Vec<&str> = adj.recommendations.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Medication Review", "Complex Dosing Support"]);
        assert!(adj.recommendations[1].description.starts_with("2 of"));
        assert_eq!(adj.factors[0], "Polypharmacy: 5 medicines in the regimen");
    }

    #[test]
    fn test_one_category_per_medicine() {
        // "warfarin" matches complex dosing first; the aspirin bonus is skipped
        let adj = adjuster(FixedLookup::default()).adjust(&entries(&["warfarin-aspirin combo"]));
        assert_eq!(adj.score_delta, -3.0 + 5.0);
        assert_eq!(adj.confidence_delta, 3.0);
    }

    #[test]
    fn test_empty_list_lowers_confidence() {
        let adj = adjuster(FixedLookup::default()).adjust_medicines(&[]);
        assert_eq!(adj.score_delta, 0.0);
        assert_eq!(adj.confidence_delta, -10.0);
        assert_eq!(adj.factors.len(), 1);
    }

    #[test]
    fn test_adjustment_is_idempotent() {
        let lookup = FixedLookup::default().with("Aspirin", "Warfarin", "Risk of bleeding");
        let adjuster = adjuster(lookup);
        let meds = entries(&["Aspirin", "Warfarin", "Metformin"]);
        assert_eq!(adjuster.adjust(&meds), adjuster.adjust(&meds));
    }

    #[test]
    fn test_record_entries_are_normalized() {
        let list: Vec<MedicineEntry> =
            serde_json::from_str(r#"[{"name": "DrugA"}, " DrugB "]"#).expect("Should parse");
        let lookup = FixedLookup::default().with("DrugA", "DrugB", "Contraindicated");
        let adj = adjuster(lookup).adjust(&list);
        assert_eq!(adj.interactions.high, 1);
        assert_eq!(adj.interactions.interactions[0].drug_b, "DrugB");
    }
}
