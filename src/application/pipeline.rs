//! Risk pipeline: feature selection, scoring and tiering for all domains.
//!
//! Each request runs every domain once. Domains share nothing but the
//! read-only registry, so they can run sequentially or on scoped threads with
//! identical results. Any failure aborts the whole request; a combined result
//! is only produced when all three domains succeed.

use std::sync::Arc;

use crate::domain::{CombinedResult, FeatureMapping, RiskDomain, RiskResult};
use crate::GeririskError;

use super::registry::ModelRegistry;
use super::scorer::RiskScorer;

/// Stateless orchestrator over a loaded [`ModelRegistry`].
#[derive(Debug, Clone)]
pub struct RiskPipeline {
    scorer: RiskScorer,
    parallel: bool,
}

impl RiskPipeline {
    /// Create a sequential pipeline.
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            scorer: RiskScorer::new(registry),
            parallel: false,
        }
    }

    /// Run the three domains on scoped threads.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Score and tier a single domain.
    ///
    /// # Errors
    /// `GeririskError::Feature` for missing or invalid input,
    /// `GeririskError::Inference` if the artifacts reject the vector.
    pub fn assess(
        &self,
        domain: RiskDomain,
        mapping: &FeatureMapping,
    ) -> Result<RiskResult, GeririskError> {
        let features = domain.schema().select(mapping)?;

        let probability = self.scorer.score(domain, &features).map_err(|source| {
            tracing::error!("Inference contract violated for {} domain: {}", domain, source);
            GeririskError::Inference { domain, source }
        })?;

        let result = RiskResult::from_probability(probability);
        tracing::debug!(
            "{} risk: score={:.3}, level={}",
            domain,
            result.score,
            result.level
        );
        Ok(result)
    }

    /// Score all three domains.
    ///
    /// # Errors
    /// Returns the first failing domain's error, in
    /// [`RiskDomain::ALL`] order. No partial result is returned.
    pub fn predict(&self, mapping: &FeatureMapping) -> Result<CombinedResult, GeririskError> {
        let [cardiac_risk, fall_risk, respiratory_risk] = if self.parallel {
            self.assess_parallel(mapping)?
        } else {
            [
                self.assess(RiskDomain::Cardiac, mapping)?,
                self.assess(RiskDomain::Fall, mapping)?,
                self.assess(RiskDomain::Respiratory, mapping)?,
            ]
        };

        let combined = CombinedResult {
            cardiac_risk,
            fall_risk,
            respiratory_risk,
        };

        tracing::info!(
            "Risk assessment complete: cardiac={}, fall={}, respiratory={}",
            combined.cardiac_risk.level,
            combined.fall_risk.level,
            combined.respiratory_risk.level
        );
        Ok(combined)
    }

    fn assess_parallel(&self, mapping: &FeatureMapping) -> Result<[RiskResult; 3], GeririskError> {
        std::thread::scope(|scope| {
            let handles =
                RiskDomain::ALL.map(|domain| scope.spawn(move || self.assess(domain, mapping)));

            // Join everything before reporting, so no worker outlives the request.
            let [cardiac, fall, respiratory] = handles.map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(GeririskError::Internal("risk domain worker panicked".into()))
                })
            });

            Ok([cardiac?, fall?, respiratory?])
        })
    }
}
