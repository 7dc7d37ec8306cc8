//! Storage port: Trait for persistent storage operations.
//!
//! This trait abstracts the storage backend (SQLite) from the application logic.

use crate::domain::Assessment;

/// A persisted model artifact as read back from storage.
///
/// The blob is opaque to the store; its integrity has been verified
/// against the checksum recorded on save.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    /// Schema version recorded alongside the blob
    pub schema_version: u32,
    /// Serialized artifact
    pub blob: Vec<u8>,
    /// SHA-256 of the blob, hex encoded
    pub checksum: String,
    /// When the artifact was saved
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for local storage operations.
pub trait Storage: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save the trained model artifact, replacing any previous one.
    ///
    /// The write is a single statement: either the new artifact is stored
    /// completely or the old one is left untouched.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_artifact(&self, schema_version: u32, blob: &[u8]) -> Result<(), Self::Error>;

    /// Load the trained model artifact.
    ///
    /// # Returns
    /// `None` if no artifact is stored.
    ///
    /// # Errors
    /// Returns error if storage operation fails or the blob does not match
    /// its recorded checksum.
    fn load_artifact(&self) -> Result<Option<StoredArtifact>, Self::Error>;

    /// Check if an artifact exists in storage.
    fn has_artifact(&self) -> Result<bool, Self::Error>;

    /// Delete the stored artifact.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn delete_artifact(&self) -> Result<(), Self::Error>;

    /// Save an assessment to the history.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_assessment(&self, assessment: &Assessment) -> Result<(), Self::Error>;

    /// Load recent assessments (up to `limit`), newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_recent_assessments(&self, limit: usize) -> Result<Vec<Assessment>, Self::Error>;

    /// Get the total count of assessments.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_assessments(&self) -> Result<usize, Self::Error>;

    /// Clear the artifact and the assessment history.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn clear_all(&self) -> Result<(), Self::Error>;
}
