//! Risk scorer: raw feature vector to positive-class probability.

use std::sync::Arc;

use crate::domain::RiskDomain;
use crate::ports::InferenceError;

use super::registry::ModelRegistry;

/// Index of the at-risk class in a two-class probability output.
const POSITIVE_CLASS: usize = 1;

/// Runs the scaler and classifier of one domain.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    registry: Arc<ModelRegistry>,
}

impl RiskScorer {
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Normalize `features` and return the classifier's positive-class
    /// probability. One scaler call and one classifier call, nothing else.
    ///
    /// # Errors
    /// Returns `InferenceError` if either artifact rejects the vector or the
    /// classifier output is not a valid two-class distribution.
    pub fn score(&self, domain: RiskDomain, features: &[f64]) -> Result<f64, InferenceError> {
        let artifacts = self.registry.get(domain);

        let normalized = artifacts.scaler.transform(features)?;
        if normalized.len() != features.len() {
            return Err(InferenceError::ShapeMismatch {
                stage: "scaler output",
                expected: features.len(),
                actual: normalized.len(),
            });
        }

        let proba = artifacts.model.predict_proba(&normalized)?;
        if proba.len() != 2 {
            return Err(InferenceError::NotBinary {
                classes: proba.len(),
            });
        }

        let p = proba[POSITIVE_CLASS];
        if !p.is_finite() {
            return Err(InferenceError::NonFinite {
                stage: "classifier",
            });
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(InferenceError::ProbabilityOutOfRange(p));
        }

        Ok(p)
    }
}
