//! Domain layer: Core business types and logic.
//!
//! Pure types with no I/O: the feature mapping and per-domain schemas,
//! risk domains, tiers and results.

mod features;
mod risk;

pub use features::{FeatureError, FeatureMapping, FeatureName, FeatureSchema};
pub use risk::{
    round_score, CombinedResult, RiskDomain, RiskLevel, RiskResult, HIGH_RISK_THRESHOLD,
    MODERATE_RISK_THRESHOLD, SCORE_DECIMALS,
};
