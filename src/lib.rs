//! # geririsk
//!
//! Cardiac, fall and respiratory risk scoring from derived vital-sign
//! features.
//!
//! Each request carries a flat mapping of aggregate features (average and
//! extreme heart rate, minimum SpO2, step and record counts). For each risk
//! domain the pipeline selects that domain's ordered feature subset,
//! normalizes it with a fitted scaler, obtains a positive-class probability
//! from a fitted classifier and maps it to a `Low` / `Moderate` / `High` tier.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: feature mapping, per-domain schemas, tiers and results
//! - `ports`: traits for scalers, classifiers and the artifact store
//! - `adapters`: JSON linear models and the signed model-directory loader
//! - `application`: model registry, scorer and pipeline
//! - `config`: environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

use std::sync::Arc;

pub use application::{ModelRegistry, RiskPipeline};
pub use config::AppConfig;
pub use domain::{CombinedResult, FeatureMapping, RiskDomain, RiskLevel, RiskResult};

use adapters::FsArtifactStore;
use domain::FeatureError;
use ports::{ArtifactLoadError, InferenceError};

/// Result type for geririsk operations
pub type Result<T> = std::result::Result<T, GeririskError>;

/// Main error type for geririsk
#[derive(Debug, thiserror::Error)]
pub enum GeririskError {
    #[error("Invalid request: {0}")]
    Feature(#[from] FeatureError),

    #[error("Malformed request: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    #[error("Inference failed for {domain} domain: {source}")]
    Inference {
        domain: RiskDomain,
        #[source]
        source: InferenceError,
    },

    #[error("Failed to load model artifacts: {0}")]
    ArtifactLoad(#[from] ArtifactLoadError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GeririskError {
    /// Whether the caller's input caused the failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Feature(_) | Self::MalformedRequest(_))
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Feature(_) | Self::MalformedRequest(_) => 2,
            Self::Inference { .. } | Self::Internal(_) => 3,
            Self::ArtifactLoad(_) | Self::Config(_) => 4,
            Self::Io(_) | Self::Serialization(_) => 1,
        }
    }
}

/// Open the configured model directory and build a ready pipeline.
///
/// This is the only fallible startup step; nothing is served until it
/// succeeds.
///
/// # Errors
/// Returns `GeririskError::ArtifactLoad` or `GeririskError::Config` if any
/// domain's artifacts cannot be loaded.
pub fn build_pipeline(config: &AppConfig) -> Result<RiskPipeline> {
    let policy = config.integrity_policy()?;
    let store = FsArtifactStore::open(&config.model_dir, &policy)?;
    let registry = ModelRegistry::load(&store)?;
    Ok(RiskPipeline::new(Arc::new(registry)).with_parallel(config.parallel_domains))
}

/// Score one JSON request and render the JSON response.
///
/// # Errors
/// Returns `GeririskError::MalformedRequest` if `input` is not a JSON object,
/// otherwise any error from [`RiskPipeline::predict`].
pub fn predict_json(pipeline: &RiskPipeline, input: &str) -> Result<String> {
    let mapping: FeatureMapping =
        serde_json::from_str(input).map_err(GeririskError::MalformedRequest)?;
    let result = pipeline.predict(&mapping)?;
    Ok(serde_json::to_string(&result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs_store::test_support::{
        random_signing_key, sign_dir, write_constant_artifacts,
    };
    use base64::Engine;
    use serde_json::Value;
    use std::path::Path;
    use tempfile::tempdir;

    const EXAMPLE_REQUEST: &str = r#"{
        "avgHeartRate": 72,
        "maxHeartRate": 140,
        "minHeartRate": 55,
        "minSpO2": 97,
        "totalSteps": 5000,
        "recordCount": 288
    }"#;

    fn config_for(dir: &Path) -> AppConfig {
        AppConfig {
            model_dir: dir.to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_predict_json_end_to_end() {
        let temp = tempdir().expect("tempdir");
        // sigmoid(-2.2) ~= 0.0998
        write_constant_artifacts(temp.path(), -2.2);
        let pipeline = build_pipeline(&config_for(temp.path())).expect("Should build");

        let output = predict_json(&pipeline, EXAMPLE_REQUEST).expect("Should predict");
        let value: Value = serde_json::from_str(&output).expect("valid json");
        let obj = value.as_object().expect("object");
        assert_eq!(obj.len(), 3);
        for key in ["cardiacRisk", "fallRisk", "respiratoryRisk"] {
            assert_eq!(value[key]["level"], "Low");
            assert_eq!(value[key]["score"], 0.1);
        }
    }

    #[test]
    fn test_bundled_models_score_example_as_low() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("ml/models");
        let pipeline = build_pipeline(&config_for(&dir)).expect("bundled models load");

        let mapping: FeatureMapping = serde_json::from_str(EXAMPLE_REQUEST).expect("valid json");
        let result = pipeline.predict(&mapping).expect("Should predict");
        for domain in RiskDomain::ALL {
            let r = result.get(domain);
            assert_eq!(r.level, RiskLevel::Low, "{domain}");
            assert!((0.09..=0.11).contains(&r.score), "{domain}: {}", r.score);
        }
    }

    #[test]
    fn test_malformed_request() {
        let temp = tempdir().expect("tempdir");
        write_constant_artifacts(temp.path(), 0.0);
        let pipeline = build_pipeline(&config_for(temp.path())).expect("Should build");

        for input in ["", "[1, 2, 3]", "{\"avgHeartRate\": "] {
            let err = predict_json(&pipeline, input).expect_err("must fail");
            assert!(matches!(err, GeririskError::MalformedRequest(_)));
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn test_missing_artifact_prevents_startup() {
        let temp = tempdir().expect("tempdir");
        write_constant_artifacts(temp.path(), 0.0);
        std::fs::remove_file(temp.path().join("fall_risk_model.json")).expect("remove");

        let err = build_pipeline(&config_for(temp.path())).expect_err("must fail");
        assert!(matches!(err, GeririskError::ArtifactLoad(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_signed_model_dir_with_configured_key() {
        let temp = tempdir().expect("tempdir");
        write_constant_artifacts(temp.path(), 2.2);
        let key = random_signing_key();
        sign_dir(temp.path(), &key);

        let config = AppConfig {
            require_signed_models: true,
            model_pubkey_b64: Some(
                base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes()),
            ),
            ..config_for(temp.path())
        };
        let pipeline = build_pipeline(&config).expect("Should build");
        let output = predict_json(&pipeline, EXAMPLE_REQUEST).expect("Should predict");
        let value: Value = serde_json::from_str(&output).expect("valid json");
        assert_eq!(value["cardiacRisk"]["level"], "High");
    }

    #[test]
    fn test_error_classification() {
        let err = GeririskError::Feature(FeatureError::Missing(domain::FeatureName::MinSpO2));
        assert!(err.is_client_error());
        assert_eq!(err.exit_code(), 2);

        let err = GeririskError::Inference {
            domain: RiskDomain::Fall,
            source: InferenceError::NotBinary { classes: 1 },
        };
        assert!(!err.is_client_error());
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("fall"));
    }
}
