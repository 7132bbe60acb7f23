//! Artifact store port: Trait for loading fitted model artifacts.
//!
//! Artifacts are addressed by `(domain, kind)`. The store owns the
//! serialization format; the registry only sees the decoded trait objects.

use std::sync::Arc;

use crate::domain::RiskDomain;

use super::model::{FeatureScaler, ProbabilityModel};

/// Kind of artifact stored per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Scaler,
    Model,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [Self::Scaler, Self::Model];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scaler => "scaler",
            Self::Model => "model",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for artifact loading. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactLoadError {
    #[error("{domain} {kind} artifact not found at {location}")]
    Missing {
        domain: RiskDomain,
        kind: ArtifactKind,
        location: String,
    },

    #[error("{domain} {kind} artifact is corrupt: {reason}")]
    Corrupt {
        domain: RiskDomain,
        kind: ArtifactKind,
        reason: String,
    },

    #[error("{domain} {kind} artifact was fitted on {found:?}, expected {expected:?}")]
    SchemaMismatch {
        domain: RiskDomain,
        kind: ArtifactKind,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Artifact integrity check failed: {0}")]
    Integrity(String),

    #[error("IO error reading artifacts: {0}")]
    Io(#[from] std::io::Error),
}

/// Fitted scaler and classifier for one domain.
///
/// Shared read-only for the process lifetime.
#[derive(Clone)]
pub struct ModelArtifacts {
    pub scaler: Arc<dyn FeatureScaler>,
    pub model: Arc<dyn ProbabilityModel>,
}

impl ModelArtifacts {
    pub fn new(scaler: Arc<dyn FeatureScaler>, model: Arc<dyn ProbabilityModel>) -> Self {
        Self { scaler, model }
    }
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("scaler_features", &self.scaler.n_features())
            .field("model_features", &self.model.n_features())
            .finish()
    }
}

/// Source of fitted artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Load the scaler and classifier for one domain.
    ///
    /// # Errors
    /// Returns `ArtifactLoadError` if either artifact is missing, unreadable
    /// or fails integrity checks.
    fn load(&self, domain: RiskDomain) -> Result<ModelArtifacts, ArtifactLoadError>;
}
