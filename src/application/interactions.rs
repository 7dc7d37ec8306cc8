//! Interaction service: pairwise checks, summaries, per-drug search and
//! batch medicine info.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{
    normalize_medicines, DrugInteraction, InteractionRecord, InteractionSummary, MedicineEntry,
    MedicineInfo, MedicineStats,
};
use crate::ports::{InteractionLookup, MedicineLookup};

/// Look up every unordered pair of `names`, in `(i, j)` order with `i < j`.
///
/// Cost is quadratic in the number of names; regimens are small and no cap
/// is applied.
pub fn pairwise<I: InteractionLookup + ?Sized>(
    lookup: &I,
    names: &[String],
) -> Vec<InteractionRecord> {
    let mut found = Vec::new();
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            if let Some(record) = lookup.lookup(a, b) {
                found.push(record);
            }
        }
    }
    found
}

/// Service for drug reference queries.
pub struct InteractionService<I, M>
where
    I: InteractionLookup,
    M: MedicineLookup,
{
    interactions: Arc<I>,
    medicines: Arc<M>,
}

impl<I, M> InteractionService<I, M>
where
    I: InteractionLookup,
    M: MedicineLookup,
{
    /// Create a new interaction service.
    pub fn new(interactions: Arc<I>, medicines: Arc<M>) -> Self {
        Self {
            interactions,
            medicines,
        }
    }

    /// All interactions among the given medicines.
    #[must_use]
    pub fn check(&self, entries: &[MedicineEntry]) -> Vec<InteractionRecord> {
        let names: Vec<String> = normalize_medicines(entries)
            .into_iter()
            .map(|m| m.name)
            .collect();
        if names.len() < 2 {
            return Vec::new();
        }
        pairwise(self.interactions.as_ref(), &names)
    }

    /// Interactions among the given medicines, counted by severity.
    #[must_use]
    pub fn summary(&self, entries: &[MedicineEntry]) -> InteractionSummary {
        let summary = InteractionSummary::from_records(self.check(entries));
        tracing::debug!(
            "Interaction summary: {} total ({} high, {} medium, {} low)",
            summary.total,
            summary.high,
            summary.medium,
            summary.low
        );
        summary
    }

    /// Every known interaction partner of `drug`.
    #[must_use]
    pub fn search_drug(&self, drug: &str) -> Vec<DrugInteraction> {
        let drug = drug.trim();
        if drug.is_empty() {
            return Vec::new();
        }
        self.interactions.interactions_for(drug)
    }

    /// Reference info for each name that is known, keyed by the name as
    /// given.
    #[must_use]
    pub fn medicine_batch(&self, names: &[String]) -> BTreeMap<String, MedicineInfo> {
        names
            .iter()
            .filter_map(|name| {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return None;
                }
                self.medicines
                    .info(trimmed)
                    .map(|info| (trimmed.to_string(), info))
            })
            .collect()
    }

    /// Reference info for one medicine.
    #[must_use]
    pub fn medicine(&self, name: &str) -> Option<MedicineInfo> {
        self.medicines.info(name.trim())
    }

    /// Aggregate figures over the medicine reference data.
    #[must_use]
    pub fn medicine_stats(&self) -> MedicineStats {
        let stats = self.medicines.stats();
        tracing::debug!(
            "Medicine stats: {} medicines, {} habit-forming",
            stats.total_medicines,
            stats.habit_forming_count
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteStorage;
    use crate::domain::Severity;

    fn service() -> InteractionService<SqliteStorage, SqliteStorage> {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        storage
            .import_interaction("Warfarin", "Aspirin", "May cause severe bleeding")
            .expect("Should import");
        storage
            .import_interaction("Aspirin", "Ibuprofen", "Decreased antiplatelet effect")
            .expect("Should import");
        storage
            .import_interaction("Metformin", "Ibuprofen", "Minor absorption change")
            .expect("Should import");
        storage
            .import_medicine(&MedicineInfo::named("Aspirin"))
            .expect("Should import");
        InteractionService::new(Arc::clone(&storage), storage)
    }

    #[test]
    fn test_summary_counts_by_severity() {
        let entries: Vec<MedicineEntry> = ["Warfarin", "Aspirin", "Ibuprofen", "Metformin"]
            .into_iter()
            .map(MedicineEntry::from)
            .collect();
        let summary = service().summary(&entries);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.interactions[0].drug_a, "Warfarin");
        assert_eq!(summary.interactions[0].drug_b, "Aspirin");
    }

    #[test]
    fn test_fewer_than_two_medicines() {
        let svc = service();
        assert_eq!(svc.summary(&[]), InteractionSummary::default());
        assert_eq!(
            svc.summary(&[MedicineEntry::from("Aspirin"), MedicineEntry::from("  ")]),
            InteractionSummary::default()
        );
    }

    #[test]
    fn test_search_drug() {
        let svc = service();
        let found = svc.search_drug("aspirin");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].interacting_drug, "Ibuprofen");
        assert_eq!(found[0].severity, Severity::Medium);
        assert_eq!(found[1].interacting_drug, "Warfarin");
        assert_eq!(found[1].severity, Severity::High);
        assert!(svc.search_drug("   ").is_empty());
    }

    #[test]
    fn test_medicine_batch_skips_unknown() {
        let svc = service();
        let batch = svc.medicine_batch(&["Aspirin".to_string(), "Unobtainium".to_string()]);
        assert_eq!(batch.len(), 1);
        assert!(batch.contains_key("Aspirin"));
        assert!(svc.medicine(" aspirin ").is_some());
    }

    #[test]
    fn test_medicine_stats() {
        let svc = service();
        let mut info = MedicineInfo::named("Tramadol");
        info.habit_forming = "Yes".to_string();
        info.therapeutic_class = "PAIN ANALGESICS".to_string();
        svc.medicines.import_medicine(&info).expect("Should import");

        let stats = svc.medicine_stats();
        assert_eq!(stats.total_medicines, 2);
        assert_eq!(stats.habit_forming_count, 1);
        assert_eq!(stats.therapeutic_classes, 1);
        assert_eq!(stats.chemical_classes, 0);
    }
}
