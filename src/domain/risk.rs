//! Risk domains, tiers and per-request results.

use serde::{Deserialize, Serialize};

use super::features::{FeatureName, FeatureSchema};

/// Probability at or above which a score is `High`.
pub const HIGH_RISK_THRESHOLD: f64 = 0.75;

/// Probability at or above which a score is at least `Moderate`.
pub const MODERATE_RISK_THRESHOLD: f64 = 0.4;

/// Decimal places kept in the reported score.
pub const SCORE_DECIMALS: usize = 3;

const CARDIAC_FEATURES: FeatureSchema = FeatureSchema::new(&[
    FeatureName::AvgHeartRate,
    FeatureName::MaxHeartRate,
    FeatureName::MinHeartRate,
    FeatureName::MinSpO2,
    FeatureName::TotalSteps,
    FeatureName::RecordCount,
]);

const FALL_FEATURES: FeatureSchema = FeatureSchema::new(&[
    FeatureName::AvgHeartRate,
    FeatureName::TotalSteps,
    FeatureName::RecordCount,
]);

const RESPIRATORY_FEATURES: FeatureSchema = FeatureSchema::new(&[
    FeatureName::MinSpO2,
    FeatureName::AvgHeartRate,
    FeatureName::RecordCount,
]);

/// One of the three independently scored risk domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskDomain {
    Cardiac,
    Fall,
    Respiratory,
}

impl RiskDomain {
    /// All domains, in the order the pipeline evaluates them.
    pub const ALL: [RiskDomain; 3] = [Self::Cardiac, Self::Fall, Self::Respiratory];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cardiac => "cardiac",
            Self::Fall => "fall",
            Self::Respiratory => "respiratory",
        }
    }

    /// Key of this domain in the combined response.
    #[must_use]
    pub fn result_key(&self) -> &'static str {
        match self {
            Self::Cardiac => "cardiacRisk",
            Self::Fall => "fallRisk",
            Self::Respiratory => "respiratoryRisk",
        }
    }

    /// Ordered features this domain's artifacts were fitted with.
    #[must_use]
    pub fn schema(&self) -> FeatureSchema {
        match self {
            Self::Cardiac => CARDIAC_FEATURES,
            Self::Fall => FALL_FEATURES,
            Self::Respiratory => RESPIRATORY_FEATURES,
        }
    }
}

impl std::fmt::Display for RiskDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete risk tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// Tier a probability. Lower bounds are inclusive: 0.75 is `High`,
    /// 0.4 is `Moderate`.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_RISK_THRESHOLD {
            Self::High
        } else if probability >= MODERATE_RISK_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round a probability to [`SCORE_DECIMALS`] places for reporting.
///
/// Rounds the exact binary value once, ties to even.
#[must_use]
pub fn round_score(probability: f64) -> f64 {
    let decimals = SCORE_DECIMALS;
    // Float Display output always parses back; fall back to the input otherwise.
    format!("{probability:.decimals$}")
        .parse()
        .unwrap_or(probability)
}

/// Score and tier for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Positive-class probability, rounded to three decimals.
    pub score: f64,
    pub level: RiskLevel,
}

impl RiskResult {
    /// Build a result from a full-precision probability.
    ///
    /// The tier is taken from the unrounded value so that, e.g., 0.7496 stays
    /// `Moderate` even though it is reported as 0.75.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        Self {
            score: round_score(probability),
            level: RiskLevel::from_probability(probability),
        }
    }
}

/// Results for all three domains. Every field is always present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CombinedResult {
    pub cardiac_risk: RiskResult,
    pub fall_risk: RiskResult,
    pub respiratory_risk: RiskResult,
}

impl CombinedResult {
    #[must_use]
    pub fn get(&self, domain: RiskDomain) -> &RiskResult {
        match domain {
            RiskDomain::Cardiac => &self.cardiac_risk,
            RiskDomain::Fall => &self.fall_risk,
            RiskDomain::Respiratory => &self.respiratory_risk,
        }
    }
}
