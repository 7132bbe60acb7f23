//! Linear adapters: standard scaler and logistic regression.
//!
//! These implement the model ports for artifacts exported by the training
//! pipeline as JSON. The formulas follow the usual conventions:
//!
//! - scaler: `z_i = (x_i - mean_i) / scale_i`
//! - classifier: `p = sigmoid(w . z + b)`, optionally passed through an
//!   isotonic calibration curve
//!
//! All parameters are validated on construction so that inference itself can
//! only fail on a shape mismatch.

use serde::{Deserialize, Serialize};

use crate::ports::{FeatureScaler, InferenceError, ProbabilityModel};

/// Upper bound on features per artifact; the widest domain uses 6.
const MAX_FEATURES: usize = 64;

fn check_finite(label: &str, values: &[f64]) -> Result<(), String> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(format!("{label}[{i}] is not finite")),
        None => Ok(()),
    }
}

fn check_names(names: &Option<Vec<String>>, n: usize) -> Result<(), String> {
    match names {
        Some(names) if names.len() != n => Err(format!(
            "feature_names has {} entries, parameters have {n}",
            names.len()
        )),
        _ => Ok(()),
    }
}

fn check_shape(stage: &'static str, expected: usize, actual: usize) -> Result<(), InferenceError> {
    if expected == actual {
        Ok(())
    } else {
        Err(InferenceError::ShapeMismatch {
            stage,
            expected,
            actual,
        })
    }
}

/// Fitted per-feature standardization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Build a scaler, validating parameter shapes.
    ///
    /// # Errors
    /// Returns a description of the first invalid parameter.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, String> {
        let scaler = Self {
            feature_names: None,
            mean,
            scale,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Decode and validate a JSON artifact.
    ///
    /// # Errors
    /// Returns a description of the decode or validation failure.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, String> {
        let scaler: Self = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> Result<(), String> {
        let n = self.mean.len();
        if n == 0 || n > MAX_FEATURES {
            return Err(format!("invalid feature count {n} (max {MAX_FEATURES})"));
        }
        if self.scale.len() != n {
            return Err(format!(
                "scale has {} entries, mean has {n}",
                self.scale.len()
            ));
        }
        check_finite("mean", &self.mean)?;
        check_finite("scale", &self.scale)?;
        if let Some(i) = self.scale.iter().position(|&s| s < 0.0) {
            return Err(format!("scale[{i}] is negative"));
        }
        check_names(&self.feature_names, n)
    }
}

impl FeatureScaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_shape("scaler", self.mean.len(), features.len())?;

        let out: Vec<f64> = features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            // A zero scale marks a constant feature at fit time.
            .map(|(&x, (&mean, &scale))| {
                let scale = if scale == 0.0 { 1.0 } else { scale };
                (x - mean) / scale
            })
            .collect();

        // Overflow to +-inf is a valid extreme; only NaN is undefined.
        if out.iter().any(|v| v.is_nan()) {
            return Err(InferenceError::NonFinite { stage: "scaler" });
        }
        Ok(out)
    }
}

/// Monotone piecewise-linear probability calibration.
///
/// Inputs outside the breakpoint range clamp to the first/last output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl CalibrationCurve {
    fn validate(&self) -> Result<(), String> {
        if self.x.len() < 2 || self.x.len() != self.y.len() {
            return Err(format!(
                "calibration needs at least 2 matching breakpoints, got x={} y={}",
                self.x.len(),
                self.y.len()
            ));
        }
        check_finite("calibration.x", &self.x)?;
        check_finite("calibration.y", &self.y)?;
        if self.x.windows(2).any(|w| w[1] <= w[0]) {
            return Err("calibration.x must be strictly increasing".into());
        }
        if self.y.windows(2).any(|w| w[1] < w[0]) {
            return Err("calibration.y must be non-decreasing".into());
        }
        if self.y.iter().any(|y| !(0.0..=1.0).contains(y)) {
            return Err("calibration.y must lie in [0, 1]".into());
        }
        Ok(())
    }

    /// Map a raw probability through the curve.
    #[must_use]
    pub fn apply(&self, p: f64) -> f64 {
        let last = self.x.len() - 1;
        if p <= self.x[0] {
            return self.y[0];
        }
        if p >= self.x[last] {
            return self.y[last];
        }

        // First breakpoint strictly greater than p; guaranteed in 1..=last.
        let hi = self.x.partition_point(|&x| x <= p);
        let lo = hi - 1;
        let t = (p - self.x[lo]) / (self.x[hi] - self.x[lo]);
        self.y[lo] + t * (self.y[hi] - self.y[lo])
    }
}

/// Fitted binary logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationCurve>,
}

impl LogisticModel {
    /// Build an uncalibrated model, validating parameter shapes.
    ///
    /// # Errors
    /// Returns a description of the first invalid parameter.
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, String> {
        let model = Self {
            feature_names: None,
            coefficients,
            intercept,
            calibration: None,
        };
        model.validate()?;
        Ok(model)
    }

    /// Decode and validate a JSON artifact.
    ///
    /// # Errors
    /// Returns a description of the decode or validation failure.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, String> {
        let model: Self = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), String> {
        let n = self.coefficients.len();
        if n == 0 || n > MAX_FEATURES {
            return Err(format!("invalid feature count {n} (max {MAX_FEATURES})"));
        }
        check_finite("coefficients", &self.coefficients)?;
        if !self.intercept.is_finite() {
            return Err("intercept is not finite".into());
        }
        if let Some(curve) = &self.calibration {
            curve.validate()?;
        }
        check_names(&self.feature_names, n)
    }

    /// Linear decision function `w . z + b`. Zero weights contribute
    /// nothing, even for an infinite input.
    fn decision(&self, features: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(features)
            .filter(|(w, _)| **w != 0.0)
            .map(|(w, z)| w * z)
            .sum::<f64>()
            + self.intercept
    }
}

/// Numerically stable logistic function.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

impl ProbabilityModel for LogisticModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_shape("classifier", self.coefficients.len(), features.len())?;

        let z = self.decision(features);
        if z.is_nan() {
            return Err(InferenceError::NonFinite {
                stage: "classifier",
            });
        }

        let mut p = sigmoid(z);
        if let Some(curve) = &self.calibration {
            p = curve.apply(p);
        }
        Ok(vec![1.0 - p, p])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_transform() {
        let scaler = StandardScaler::new(vec![70.0, 5000.0], vec![10.0, 0.0]).expect("valid");
        let z = scaler.transform(&[80.0, 5200.0]).expect("Should transform");
        assert!((z[0] - 1.0).abs() < 1e-12);
        // Zero scale leaves the centered value unscaled.
        assert!((z[1] - 200.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_rejects_wrong_arity() {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).expect("valid");
        let err = scaler.transform(&[1.0, 2.0]).expect_err("must fail");
        assert_eq!(
            err,
            InferenceError::ShapeMismatch {
                stage: "scaler",
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_scaler_json_validation() {
        let ok = br#"{"feature_names":["a","b"],"mean":[1.0,2.0],"scale":[1.0,2.0]}"#;
        let scaler = StandardScaler::from_json_slice(ok).expect("Should decode");
        assert_eq!(scaler.feature_names(), Some(&["a".to_string(), "b".to_string()][..]));

        let mismatched = br#"{"mean":[1.0,2.0],"scale":[1.0]}"#;
        assert!(StandardScaler::from_json_slice(mismatched).is_err());

        let bad_names = br#"{"feature_names":["a"],"mean":[1.0,2.0],"scale":[1.0,1.0]}"#;
        assert!(StandardScaler::from_json_slice(bad_names).is_err());

        assert!(StandardScaler::from_json_slice(b"not json").is_err());
    }

    #[test]
    fn test_logistic_probabilities() {
        let model = LogisticModel::new(vec![1.0, -1.0], 0.0).expect("valid");
        let proba = model.predict_proba(&[0.5, 0.5]).expect("Should predict");
        assert_eq!(proba.len(), 2);
        assert!((proba[1] - 0.5).abs() < 1e-12);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);

        let high = model.predict_proba(&[3.0, 0.0]).expect("Should predict");
        assert!(high[1] > 0.95);
    }

    #[test]
    fn test_extreme_inputs_saturate() {
        // A tiny scale turns a large but finite reading into +inf.
        let scaler = StandardScaler::new(vec![0.0, 0.0], vec![1e-300, 1.0]).expect("valid");
        let z = scaler.transform(&[1e300, 2.0]).expect("Should transform");
        assert_eq!(z[0], f64::INFINITY);

        let model = LogisticModel::new(vec![0.5, 0.0], 0.0).expect("valid");
        assert_eq!(model.predict_proba(&z).expect("Should predict"), vec![0.0, 1.0]);

        let model = LogisticModel::new(vec![-0.5, 1.0], 0.0).expect("valid");
        assert_eq!(model.predict_proba(&z).expect("Should predict"), vec![1.0, 0.0]);

        // A zero weight ignores the infinite input entirely.
        let model = LogisticModel::new(vec![0.0, 0.0], 0.0).expect("valid");
        let proba = model.predict_proba(&z).expect("Should predict");
        assert!((proba[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_decision_is_rejected() {
        let model = LogisticModel::new(vec![1.0, -1.0], 0.0).expect("valid");
        let err = model
            .predict_proba(&[f64::INFINITY, f64::INFINITY])
            .expect_err("inf - inf is undefined");
        assert!(matches!(err, InferenceError::NonFinite { .. }));

        let scaler = StandardScaler::new(vec![f64::MAX], vec![1.0]).expect("valid");
        assert!(scaler.transform(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_sigmoid_is_stable_for_large_inputs() {
        assert_eq!(sigmoid(f64::INFINITY), 1.0);
        assert_eq!(sigmoid(f64::NEG_INFINITY), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert!((sigmoid(0.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_calibration_curve() {
        let curve = CalibrationCurve {
            x: vec![0.0, 0.5, 1.0],
            y: vec![0.0, 0.2, 1.0],
        };
        curve.validate().expect("valid curve");
        assert!((curve.apply(0.25) - 0.1).abs() < 1e-12);
        assert!((curve.apply(0.75) - 0.6).abs() < 1e-12);
        assert_eq!(curve.apply(-0.1), 0.0);
        assert_eq!(curve.apply(1.0), 1.0);

        let decreasing = CalibrationCurve {
            x: vec![0.0, 1.0],
            y: vec![0.8, 0.2],
        };
        assert!(decreasing.validate().is_err());
    }

    #[test]
    fn test_calibrated_model_json() {
        let json = br#"{
            "coefficients": [0.0],
            "intercept": 0.0,
            "calibration": {"x": [0.0, 0.5, 1.0], "y": [0.0, 0.9, 1.0]}
        }"#;
        let model = LogisticModel::from_json_slice(json).expect("Should decode");
        let proba = model.predict_proba(&[0.0]).expect("Should predict");
        assert!((proba[1] - 0.9).abs() < 1e-12);
    }
}
