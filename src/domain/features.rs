//! Feature mapping and per-domain feature schemas.
//!
//! Upstream aggregation produces a flat, loosely typed mapping of named
//! vital-sign features. Each risk domain consumes a fixed, ordered subset of
//! that mapping; the order must match the one its scaler and classifier were
//! fitted with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error raised while projecting a feature mapping onto a domain schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeatureError {
    #[error("Missing required feature `{0}`")]
    Missing(FeatureName),

    #[error("Invalid value for feature `{feature}`: {reason}")]
    InvalidType { feature: FeatureName, reason: String },
}

/// Named features produced by the upstream aggregation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureName {
    AvgHeartRate,
    MaxHeartRate,
    MinHeartRate,
    MinSpO2,
    TotalSteps,
    RecordCount,
}

impl FeatureName {
    /// Key used in the request mapping and in artifact `feature_names`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AvgHeartRate => "avgHeartRate",
            Self::MaxHeartRate => "maxHeartRate",
            Self::MinHeartRate => "minHeartRate",
            Self::MinSpO2 => "minSpO2",
            Self::TotalSteps => "totalSteps",
            Self::RecordCount => "recordCount",
        }
    }
}

impl std::fmt::Display for FeatureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw request payload: feature name to (not yet validated) value.
///
/// Values stay as JSON until a schema selects them, so type errors are
/// reported against the feature that caused them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureMapping {
    values: BTreeMap<String, Value>,
}

impl FeatureMapping {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Non-finite floats are stored as `null`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Remove a value, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Read a required feature as a finite real number.
    ///
    /// Accepts JSON numbers and numeric strings. Booleans, `null`, containers
    /// and strings that do not parse to a finite value are rejected.
    ///
    /// # Errors
    /// `FeatureError::Missing` if the key is absent, `FeatureError::InvalidType`
    /// if the value cannot be coerced.
    pub fn numeric(&self, feature: FeatureName) -> Result<f64, FeatureError> {
        let value = self
            .values
            .get(feature.as_str())
            .ok_or(FeatureError::Missing(feature))?;

        let invalid = |reason: String| FeatureError::InvalidType { feature, reason };

        let number = match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| invalid(format!("{n} is not representable as f64")))?,
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| invalid(format!("string {s:?} is not numeric")))?,
            Value::Null => return Err(invalid("value is null".into())),
            Value::Bool(_) => return Err(invalid("expected a number, got a boolean".into())),
            Value::Array(_) => return Err(invalid("expected a number, got an array".into())),
            Value::Object(_) => return Err(invalid("expected a number, got an object".into())),
        };

        if !number.is_finite() {
            return Err(invalid(format!("{number} is not a finite number")));
        }

        Ok(number)
    }
}

impl<K, V> FromIterator<(K, V)> for FeatureMapping
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Ordered list of features a domain's artifacts were fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSchema {
    features: &'static [FeatureName],
}

impl FeatureSchema {
    #[must_use]
    pub const fn new(features: &'static [FeatureName]) -> Self {
        Self { features }
    }

    /// Number of features (the vector arity).
    #[must_use]
    pub fn arity(&self) -> usize {
        self.features.len()
    }

    /// Feature keys in schema order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(FeatureName::as_str).collect()
    }

    /// Whether a declared artifact feature list matches this schema exactly.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, declared: &[S]) -> bool {
        declared.len() == self.features.len()
            && declared
                .iter()
                .zip(self.features)
                .all(|(d, f)| d.as_ref() == f.as_str())
    }

    /// Project a mapping onto this schema.
    ///
    /// Every required key is validated before the vector is returned; the
    /// first failure in schema order is reported.
    ///
    /// # Errors
    /// Returns `FeatureError` naming the offending feature.
    pub fn select(&self, mapping: &FeatureMapping) -> Result<Vec<f64>, FeatureError> {
        self.features
            .iter()
            .map(|&feature| mapping.numeric(feature))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: FeatureSchema = FeatureSchema::new(&[
        FeatureName::MinSpO2,
        FeatureName::AvgHeartRate,
        FeatureName::RecordCount,
    ]);

    fn mapping() -> FeatureMapping {
        serde_json::from_value(json!({
            "avgHeartRate": 72,
            "maxHeartRate": 140,
            "minHeartRate": 55,
            "minSpO2": 97.5,
            "totalSteps": 5000,
            "recordCount": 288,
            "cardiacEvents": 3
        }))
        .expect("valid mapping")
    }

    #[test]
    fn test_select_follows_schema_order() {
        let vector = SCHEMA.select(&mapping()).expect("Should select");
        assert_eq!(vector, vec![97.5, 72.0, 288.0]);
    }

    #[test]
    fn test_select_reports_missing_feature() {
        let mut m = mapping();
        m.remove("minSpO2");
        let err = SCHEMA.select(&m).expect_err("must fail");
        assert_eq!(err, FeatureError::Missing(FeatureName::MinSpO2));
        assert!(err.to_string().contains("minSpO2"));
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let m = mapping().with("minSpO2", " 96 ");
        assert_eq!(m.numeric(FeatureName::MinSpO2), Ok(96.0));
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        for bad in ["NaN", "Infinity", "-inf", "ninety"] {
            let m = mapping().with("minSpO2", bad);
            let err = m.numeric(FeatureName::MinSpO2).expect_err("must reject");
            assert!(matches!(err, FeatureError::InvalidType { feature: FeatureName::MinSpO2, .. }));
        }

        // serde_json stores non-finite floats as null.
        let m = mapping().with("minSpO2", f64::INFINITY);
        assert!(m.numeric(FeatureName::MinSpO2).is_err());
    }

    #[test]
    fn test_non_numeric_json_types_are_rejected() {
        for bad in [json!(null), json!(true), json!([97]), json!({"v": 97})] {
            let m = mapping().with("avgHeartRate", bad);
            assert!(matches!(
                m.numeric(FeatureName::AvgHeartRate),
                Err(FeatureError::InvalidType { .. })
            ));
        }
    }

    #[test]
    fn test_schema_matches_declared_names() {
        assert!(SCHEMA.matches(&["minSpO2", "avgHeartRate", "recordCount"]));
        assert!(!SCHEMA.matches(&["avgHeartRate", "minSpO2", "recordCount"]));
        assert!(!SCHEMA.matches(&["minSpO2", "avgHeartRate"]));
    }
}
