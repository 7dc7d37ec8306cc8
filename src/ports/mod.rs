//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and its collaborators (estimators, reference
//! data lookups, storage).

mod estimator;
mod lookup;
mod storage;

pub use estimator::AdherenceEstimator;
pub use lookup::{InteractionLookup, MedicineLookup};
pub use storage::{Storage, StoredArtifact};
