//! Model port: Traits for fitted feature scalers and probabilistic classifiers.
//!
//! The pipeline treats both as opaque, already-fitted artifacts. Concrete
//! implementations live in `adapters`.

/// Error raised when a scaler or classifier rejects its input.
///
/// With a correctly loaded registry these indicate a contract violation
/// between feature selection and scoring, not bad user input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("{stage} expected {expected} features, got {actual}")]
    ShapeMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("classifier returned {classes} class probabilities, expected 2")]
    NotBinary { classes: usize },

    #[error("{stage} produced a non-finite value")]
    NonFinite { stage: &'static str },

    #[error("positive-class probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f64),
}

/// A fitted feature normalizer.
pub trait FeatureScaler: Send + Sync {
    /// Number of features the scaler was fitted on.
    fn n_features(&self) -> usize;

    /// Feature names recorded at fit time, if the artifact carries them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Normalize a raw feature vector.
    ///
    /// # Errors
    /// Returns `InferenceError::ShapeMismatch` if the vector has the wrong arity.
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;
}

/// A fitted binary classifier with probability estimates.
pub trait ProbabilityModel: Send + Sync {
    /// Number of features the classifier was fitted on.
    fn n_features(&self) -> usize;

    /// Feature names recorded at fit time, if the artifact carries them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Class probabilities `[negative, positive]` for one normalized sample.
    ///
    /// # Errors
    /// Returns `InferenceError::ShapeMismatch` if the vector has the wrong arity.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;
}
