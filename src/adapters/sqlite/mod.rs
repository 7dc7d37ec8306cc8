//! SQLite adapter: Implementation of Storage and the reference-data lookups.
//!
//! Provides local persistence for the trained model artifact, the assessment
//! history, and the drug interaction / medicine reference tables.
//!
//! # Integrity
//!
//! The artifact blob is stored with its schema version and a SHA-256
//! checksum. A blob whose checksum does not match is rejected on load.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex is recovered:
//! every statement runs to completion or fails inside SQLite, so the
//! connection itself is never left half-updated.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::domain::{
    classify_severity, Assessment, DrugInteraction, EstimatorKind, InteractionRecord,
    MedicineInfo, MedicineStats, RiskLevel,
};
use crate::ports::{InteractionLookup, MedicineLookup, Storage, StoredArtifact};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported artifact schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("Artifact checksum mismatch: stored blob is corrupted")]
    ChecksumMismatch,

    #[error("Inconsistent artifact layout: {0}")]
    InconsistentArtifact(crate::domain::EncodingError),

    #[error("Invalid reference record: {0}")]
    InvalidRecord(String),
}

/// Lookup key for drug names: trimmed and lowercased.
fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// SHA-256 of `bytes`, lowercase hex.
fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// SQLite storage adapter.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock();

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS artifacts (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                schema_version INTEGER NOT NULL,
                blob BLOB NOT NULL,
                checksum TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS assessments (
                id TEXT PRIMARY KEY,
                patient_id TEXT,
                adherence_score REAL NOT NULL,
                confidence REAL NOT NULL,
                risk_level TEXT NOT NULL,
                estimator TEXT NOT NULL,
                adjusted INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_assessments_created
                ON assessments(created_at DESC);

            CREATE TABLE IF NOT EXISTS interactions (
                drug_1 TEXT NOT NULL,
                drug_2 TEXT NOT NULL,
                name_1 TEXT NOT NULL,
                name_2 TEXT NOT NULL,
                description TEXT NOT NULL,
                PRIMARY KEY (drug_1, drug_2)
            );

            CREATE INDEX IF NOT EXISTS idx_interactions_drug_2
                ON interactions(drug_2);

            CREATE TABLE IF NOT EXISTS medicines (
                name_key TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                substitutes TEXT NOT NULL,
                side_effects TEXT NOT NULL,
                uses TEXT NOT NULL,
                chemical_class TEXT NOT NULL,
                habit_forming TEXT NOT NULL,
                therapeutic_class TEXT NOT NULL,
                action_class TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    fn risk_level_to_string(level: RiskLevel) -> &'static str {
        match level {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    fn string_to_risk_level(s: &str) -> RiskLevel {
        match s.to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    fn estimator_to_string(kind: EstimatorKind) -> &'static str {
        match kind {
            EstimatorKind::RuleBased => "rule_based",
            EstimatorKind::Ensemble => "ensemble",
        }
    }

    fn string_to_estimator(s: &str) -> EstimatorKind {
        match s {
            "ensemble" => EstimatorKind::Ensemble,
            _ => EstimatorKind::RuleBased,
        }
    }

    /// Store an interaction between two drugs, replacing any existing entry
    /// for the same pair in either order.
    ///
    /// # Errors
    /// Returns error if storage operation fails or a name is blank.
    pub fn import_interaction(
        &self,
        drug_a: &str,
        drug_b: &str,
        description: &str,
    ) -> Result<(), StorageError> {
        let (key_a, key_b) = (normalize_name(drug_a), normalize_name(drug_b));
        if key_a.is_empty() || key_b.is_empty() {
            return Err(StorageError::InvalidRecord("drug name is blank".to_string()));
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM interactions WHERE drug_1 = ?1 AND drug_2 = ?2",
            params![key_b, key_a],
        )?;
        tx.execute(
            r"
            INSERT OR REPLACE INTO interactions (drug_1, drug_2, name_1, name_2, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![key_a, key_b, drug_a.trim(), drug_b.trim(), description],
        )?;
        tx.commit()?;

        tracing::debug!("Stored interaction {} <-> {}", key_a, key_b);
        Ok(())
    }

    /// Store reference info for a medicine, replacing any existing entry.
    ///
    /// # Errors
    /// Returns error if storage operation fails or the name is blank.
    pub fn import_medicine(&self, info: &MedicineInfo) -> Result<(), StorageError> {
        let key = normalize_name(&info.name);
        if key.is_empty() {
            return Err(StorageError::InvalidRecord("medicine name is blank".to_string()));
        }
        let to_json = |v: &Vec<String>| {
            serde_json::to_string(v).map_err(|e| StorageError::Serialization(e.to_string()))
        };

        let conn = self.lock();
        conn.execute(
            r"
            INSERT OR REPLACE INTO medicines (
                name_key, name, substitutes, side_effects, uses,
                chemical_class, habit_forming, therapeutic_class, action_class
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                key,
                info.name.trim(),
                to_json(&info.substitutes)?,
                to_json(&info.side_effects)?,
                to_json(&info.uses)?,
                info.chemical_class,
                info.habit_forming,
                info.therapeutic_class,
                info.action_class,
            ],
        )?;
        Ok(())
    }

    /// Number of stored interactions.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn count_interactions(&self) -> Result<usize, StorageError> {
        let conn = self.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM interactions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Totals, habit-forming count and distinct classes of the medicine
    /// table.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn medicine_stats(&self) -> Result<MedicineStats, StorageError> {
        let conn = self.lock();
        let stats = conn.query_row(
            r"
            SELECT
                COUNT(*),
                COUNT(DISTINCT CASE WHEN TRIM(therapeutic_class) NOT IN ('', 'N/A')
                    THEN therapeutic_class END),
                COALESCE(SUM(LOWER(TRIM(habit_forming)) IN ('yes', 'true', '1')), 0),
                COUNT(DISTINCT CASE WHEN TRIM(chemical_class) NOT IN ('', 'N/A')
                    THEN chemical_class END)
            FROM medicines
            ",
            [],
            |row| {
                Ok(MedicineStats {
                    total_medicines: row.get::<_, i64>(0)? as usize,
                    therapeutic_classes: row.get::<_, i64>(1)? as usize,
                    habit_forming_count: row.get::<_, i64>(2)? as usize,
                    chemical_classes: row.get::<_, i64>(3)? as usize,
                })
            },
        )?;
        Ok(stats)
    }

    fn query_interaction(&self, key_a: &str, key_b: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock();
        let description = conn
            .query_row(
                r"
                SELECT description FROM interactions
                WHERE (drug_1 = ?1 AND drug_2 = ?2) OR (drug_1 = ?2 AND drug_2 = ?1)
                LIMIT 1
                ",
                params![key_a, key_b],
                |row| row.get(0),
            )
            .optional()?;
        Ok(description)
    }

    fn query_partners(&self, key: &str) -> Result<Vec<(String, String)>, StorageError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            r"
            SELECT CASE WHEN drug_1 = ?1 THEN name_2 ELSE name_1 END, description
            FROM interactions
            WHERE drug_1 = ?1 OR drug_2 = ?1
            ORDER BY 1
            ",
        )?;
        let rows = stmt
            .query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_medicine(&self, key: &str) -> Result<Option<MedicineInfo>, StorageError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                r"
                SELECT name, substitutes, side_effects, uses,
                       chemical_class, habit_forming, therapeutic_class, action_class
                FROM medicines WHERE name_key = ?1
                ",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        let (name, substitutes, side_effects, uses, chemical, habit, therapeutic, action) = row;
        let from_json = |s: &str| -> Result<Vec<String>, StorageError> {
            serde_json::from_str(s).map_err(|e| StorageError::Serialization(e.to_string()))
        };

        Ok(Some(MedicineInfo {
            name,
            substitutes: from_json(&substitutes)?,
            side_effects: from_json(&side_effects)?,
            uses: from_json(&uses)?,
            chemical_class: chemical,
            habit_forming: habit,
            therapeutic_class: therapeutic,
            action_class: action,
        }))
    }
}

impl Storage for SqliteStorage {
    type Error = StorageError;

    fn save_artifact(&self, schema_version: u32, blob: &[u8]) -> Result<(), Self::Error> {
        let conn = self.lock();
        let checksum = sha256_hex(blob);
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            r"
            INSERT OR REPLACE INTO artifacts (id, schema_version, blob, checksum, created_at)
            VALUES (1, ?1, ?2, ?3, ?4)
            ",
            params![schema_version, blob, checksum, now],
        )?;

        tracing::info!(
            "Saved model artifact (schema v{}, {} bytes, sha256 {})",
            schema_version,
            blob.len(),
            &checksum[..12]
        );
        Ok(())
    }

    fn load_artifact(&self) -> Result<Option<StoredArtifact>, Self::Error> {
        let conn = self.lock();

        let row = conn
            .query_row(
                "SELECT schema_version, blob, checksum, created_at FROM artifacts WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((schema_version, blob, checksum, created_at_str)) = row else {
            return Ok(None);
        };

        if sha256_hex(&blob) != checksum {
            tracing::warn!("Stored artifact failed checksum verification");
            return Err(StorageError::ChecksumMismatch);
        }

        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Ok(Some(StoredArtifact {
            schema_version,
            blob,
            checksum,
            created_at,
        }))
    }

    fn has_artifact(&self) -> Result<bool, Self::Error> {
        let conn = self.lock();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM artifacts WHERE id = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn delete_artifact(&self) -> Result<(), Self::Error> {
        let conn = self.lock();
        conn.execute("DELETE FROM artifacts WHERE id = 1", [])?;
        tracing::info!("Deleted model artifact from storage");
        Ok(())
    }

    fn save_assessment(&self, assessment: &Assessment) -> Result<(), Self::Error> {
        let conn = self.lock();

        conn.execute(
            r"
            INSERT INTO assessments (
                id, patient_id, adherence_score, confidence,
                risk_level, estimator, adjusted, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                assessment.id,
                assessment.patient_id,
                assessment.adherence_score,
                assessment.confidence,
                Self::risk_level_to_string(assessment.risk_level),
                Self::estimator_to_string(assessment.estimator),
                i64::from(assessment.adjusted),
                assessment.created_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!("Saved assessment {} to storage", assessment.id);
        Ok(())
    }

    fn load_recent_assessments(&self, limit: usize) -> Result<Vec<Assessment>, Self::Error> {
        let conn = self.lock();

        let mut stmt = conn.prepare(
            r"
            SELECT id, patient_id, adherence_score, confidence,
                   risk_level, estimator, adjusted, created_at
            FROM assessments
            ORDER BY created_at DESC
            LIMIT ?1
            ",
        )?;

        let assessments = stmt
            .query_map(params![limit as i64], |row| {
                let risk_level_str: String = row.get(4)?;
                let estimator_str: String = row.get(5)?;
                let adjusted: i64 = row.get(6)?;
                let created_at_str: String = row.get(7)?;

                let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now());

                Ok(Assessment {
                    id: row.get(0)?,
                    patient_id: row.get(1)?,
                    adherence_score: row.get(2)?,
                    confidence: row.get(3)?,
                    risk_level: Self::string_to_risk_level(&risk_level_str),
                    estimator: Self::string_to_estimator(&estimator_str),
                    adjusted: adjusted != 0,
                    created_at,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(assessments)
    }

    fn count_assessments(&self) -> Result<usize, Self::Error> {
        let conn = self.lock();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM assessments", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    fn clear_all(&self) -> Result<(), Self::Error> {
        let conn = self.lock();
        conn.execute_batch("DELETE FROM artifacts; DELETE FROM assessments;")?;
        tracing::warn!("Cleared model artifact and assessment history");
        Ok(())
    }
}

impl InteractionLookup for SqliteStorage {
    fn lookup(&self, drug_a: &str, drug_b: &str) -> Option<InteractionRecord> {
        let (key_a, key_b) = (normalize_name(drug_a), normalize_name(drug_b));
        match self.query_interaction(&key_a, &key_b) {
            Ok(found) => {
                found.map(|description| InteractionRecord::new(drug_a, drug_b, description))
            }
            Err(e) => {
                tracing::warn!("Interaction lookup failed for {} / {}: {}", key_a, key_b, e);
                None
            }
        }
    }

    fn interactions_for(&self, drug: &str) -> Vec<DrugInteraction> {
        let key = normalize_name(drug);
        match self.query_partners(&key) {
            Ok(rows) => rows
                .into_iter()
                .map(|(interacting_drug, description)| DrugInteraction {
                    interacting_drug,
                    severity: classify_severity(&description),
                    description,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Interaction search failed for {}: {}", key, e);
                Vec::new()
            }
        }
    }
}

impl MedicineLookup for SqliteStorage {
    fn info(&self, name: &str) -> Option<MedicineInfo> {
        let key = normalize_name(name);
        match self.query_medicine(&key) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Medicine lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    fn stats(&self) -> MedicineStats {
        self.medicine_stats().unwrap_or_else(|e| {
            tracing::warn!("Medicine statistics query failed: {}", e);
            MedicineStats::default()
        })
    }
}
