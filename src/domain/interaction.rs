//! Drug-drug interaction records and keyword severity classification.

use serde::{Deserialize, Serialize};

/// Any of these in a description makes the interaction high severity.
pub const HIGH_SEVERITY_KEYWORDS: [&str; 9] = [
    "severe",
    "toxic",
    "fatal",
    "dangerous",
    "contraindicated",
    "life-threatening",
    "cardiotoxic",
    "hepatotoxic",
    "nephrotoxic",
];

/// Checked only when no high-severity keyword matched.
pub const MEDIUM_SEVERITY_KEYWORDS: [&str; 7] = [
    "increased",
    "decreased",
    "may increase",
    "may decrease",
    "adverse effects",
    "side effects",
    "risk",
];

/// Interaction severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Classify a free-text description by keyword presence (case-insensitive).
#[must_use]
pub fn classify_severity(description: &str) -> Severity {
    let lower = description.to_lowercase();

    if HIGH_SEVERITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Severity::High
    } else if MEDIUM_SEVERITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// An interaction found between two medicines of a regimen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub drug_a: String,
    pub drug_b: String,
    pub description: String,
    pub severity: Severity,
}

impl InteractionRecord {
    /// Build a record, deriving severity from the description.
    #[must_use]
    pub fn new(
        drug_a: impl Into<String>,
        drug_b: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let severity = classify_severity(&description);
        Self {
            drug_a: drug_a.into(),
            drug_b: drug_b.into(),
            description,
            severity,
        }
    }
}

/// An interaction partner of a single drug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugInteraction {
    pub interacting_drug: String,
    pub description: String,
    pub severity: Severity,
}

/// Counts per severity over a set of interactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub interactions: Vec<InteractionRecord>,
}

impl InteractionSummary {
    #[must_use]
    pub fn from_records(interactions: Vec<InteractionRecord>) -> Self {
        let count = |s: Severity| interactions.iter().filter(|i| i.severity == s).count();
        Self {
            total: interactions.len(),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            interactions,
        }
    }
}
