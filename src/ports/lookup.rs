//! Lookup ports: reference data about drugs.
//!
//! Implementations treat backend failures as absence: a failed query is
//! logged and reported as "nothing found", never as an error.

use crate::domain::{DrugInteraction, InteractionRecord, MedicineInfo, MedicineStats};

/// Drug-drug interaction reference data.
pub trait InteractionLookup: Send + Sync {
    /// Interaction between two drugs, if one is known.
    ///
    /// Matching is case-insensitive and order-independent. The returned
    /// record carries the names as passed by the caller.
    fn lookup(&self, drug_a: &str, drug_b: &str) -> Option<InteractionRecord>;

    /// Every known interaction partner of one drug.
    fn interactions_for(&self, drug: &str) -> Vec<DrugInteraction>;
}

/// Medicine reference data.
pub trait MedicineLookup: Send + Sync {
    /// Reference info for a medicine, matched case-insensitively.
    fn info(&self, name: &str) -> Option<MedicineInfo>;

    /// Aggregate figures over all known medicines. Zero when nothing is
    /// known.
    fn stats(&self) -> MedicineStats;
}
