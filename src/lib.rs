//! # Adherewise
//!
//! Medication adherence scoring with drug-interaction risk adjustment.
//!
//! This crate provides:
//! - A deterministic rule-based adherence estimator (always available)
//! - A trainable ensemble estimator (bagging forest + gradient boosting)
//! - A medicine impact adjuster that folds interaction and regimen
//!   heuristics into the score, confidence and recommendations
//! - Prescription text parsing for OCR output
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and pure scoring rules
//! - `ports`: Trait definitions for estimators, lookups and artifact storage
//! - `adapters`: Concrete implementations (rule engine, ensemble, SQLite)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-driven runtime configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{
    EncodingError, Gender, PatientProfile, PredictionResult, Recommendation, RiskColor,
    RiskLevel, TrainingError,
};

/// Result type for Adherewise operations
pub type Result<T> = std::result::Result<T, AdherewiseError>;

/// Main error type for Adherewise
#[derive(Debug, thiserror::Error)]
pub enum AdherewiseError {
    #[error("Feature encoding failed: {0}")]
    Encoding(#[from] domain::EncodingError),

    #[error("Training failed: {0}")]
    Training(#[from] domain::TrainingError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Invalid patient data: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
