//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual estimators and integrations:
//! - `rules`: deterministic rule-based fallback estimator
//! - `ensemble`: trainable forest + boosting estimator and its trainer
//! - `sqlite`: SQLite for the model artifact, history and reference data

pub mod ensemble;
pub mod rules;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
