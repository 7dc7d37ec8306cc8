//! Medicine list entries, reference info and the adjustment produced from a
//! regimen.

use serde::{Deserialize, Serialize};

use super::interaction::InteractionSummary;
use super::prediction::Recommendation;

/// Medicines whose dosing is hard to get right.
pub const COMPLEX_DOSING_KEYWORDS: [&str; 5] = [
    "insulin",
    "warfarin",
    "methotrexate",
    "levothyroxine",
    "prednisone",
];

/// Long-term therapies with typical adherence problems.
pub const MODERATE_ADHERENCE_KEYWORDS: [&str; 4] =
    ["antibiotic", "antidepressant", "statin", "blood pressure"];

/// Medicines patients usually take reliably.
pub const HIGH_ADHERENCE_KEYWORDS: [&str; 3] = ["vitamin", "supplement", "aspirin"];

/// One entry of a request's medicine list: a bare name or a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MedicineEntry {
    Name(String),
    Record { name: String },
}

impl MedicineEntry {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Record { name } => name,
        }
    }
}

impl From<&str> for MedicineEntry {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

/// Canonical medicine name used by the scoring core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
}

/// Normalize polymorphic entries into trimmed names. Blank names are dropped.
#[must_use]
pub fn normalize_medicines(entries: &[MedicineEntry]) -> Vec<Medicine> {
    entries
        .iter()
        .map(|e| e.name().trim())
        .filter(|name| !name.is_empty())
        .map(|name| Medicine {
            name: name.to_string(),
        })
        .collect()
}

/// Reference data about a single medicine.
///
/// Missing keys in a JSON record take the [`MedicineInfo::named`] defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicineInfo {
    pub name: String,
    pub substitutes: Vec<String>,
    pub side_effects: Vec<String>,
    pub uses: Vec<String>,
    pub chemical_class: String,
    pub habit_forming: String,
    pub therapeutic_class: String,
    pub action_class: String,
}

impl Default for MedicineInfo {
    fn default() -> Self {
        Self::named(String::new())
    }
}

impl MedicineInfo {
    /// Create info with only a name; class fields default to "N/A".
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            substitutes: Vec::new(),
            side_effects: Vec::new(),
            uses: Vec::new(),
            chemical_class: "N/A".to_string(),
            habit_forming: "No".to_string(),
            therapeutic_class: "N/A".to_string(),
            action_class: "N/A".to_string(),
        }
    }

    #[must_use]
    pub fn is_habit_forming(&self) -> bool {
        matches!(
            self.habit_forming.trim().to_lowercase().as_str(),
            "yes" | "true" | "1"
        )
    }
}

/// Aggregate figures over the medicine reference table.
///
/// Class counts are distinct values, ignoring blank and "N/A" entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineStats {
    pub total_medicines: usize,
    pub therapeutic_classes: usize,
    pub habit_forming_count: usize,
    pub chemical_classes: usize,
}

/// Output of the medicine impact adjuster.
///
/// Deltas are unclamped; only the combined score and confidence are
/// clamped when applied to a prediction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicineAdjustment {
    pub score_delta: f64,
    pub confidence_delta: f64,
    pub recommendations: Vec<Recommendation>,
    pub factors: Vec<String>,
    pub interactions: InteractionSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polymorphic_entries() {
        let entries: Vec<MedicineEntry> =
            serde_json::from_str(r#"["Aspirin", {"name": " Warfarin "}, "  "]"#)
                .expect("Should parse");
        let meds = normalize_medicines(&entries);
        assert_eq!(
            meds,
            vec![
                Medicine {
                    name: "Aspirin".to_string()
                },
                Medicine {
                    name: "Warfarin".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_habit_forming_flags() {
        let mut info = MedicineInfo::named("x");
        assert!(!info.is_habit_forming());
        info.habit_forming = "Yes".to_string();
        assert!(info.is_habit_forming());
        info.habit_forming = "1".to_string();
        assert!(info.is_habit_forming());
    }

    #[test]
    fn test_partial_record_takes_defaults() {
        let info: MedicineInfo =
            serde_json::from_str(r#"{"name": "Aspirin", "uses": ["Pain relief"]}"#)
                .expect("Should parse");
        assert_eq!(info.uses, vec!["Pain relief".to_string()]);
        assert_eq!(info.chemical_class, "N/A");
        assert!(!info.is_habit_forming());
    }
}
