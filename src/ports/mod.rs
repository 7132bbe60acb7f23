//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the scoring pipeline and the fitted artifacts it consumes.

mod artifact_store;
mod model;

pub use artifact_store::{ArtifactKind, ArtifactLoadError, ArtifactStore, ModelArtifacts};
pub use model::{FeatureScaler, InferenceError, ProbabilityModel};
