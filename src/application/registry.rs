//! Model registry: the three fitted (scaler, classifier) pairs.
//!
//! Built once at startup from an [`ArtifactStore`] and shared read-only
//! (`Arc<ModelRegistry>`) for the rest of the process. A registry only exists
//! if all three domains loaded and matched their feature schemas.

use crate::domain::RiskDomain;
use crate::ports::{ArtifactKind, ArtifactLoadError, ArtifactStore, ModelArtifacts};

/// Read-only set of per-domain model artifacts.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    cardiac: ModelArtifacts,
    fall: ModelArtifacts,
    respiratory: ModelArtifacts,
}

impl ModelRegistry {
    /// Load and validate artifacts for every domain.
    ///
    /// # Errors
    /// Returns the first `ArtifactLoadError` encountered; no partially
    /// loaded registry is ever returned.
    pub fn load<S>(store: &S) -> Result<Self, ArtifactLoadError>
    where
        S: ArtifactStore + ?Sized,
    {
        tracing::info!("Loading model artifacts...");

        let registry = Self {
            cardiac: Self::load_domain(store, RiskDomain::Cardiac)?,
            fall: Self::load_domain(store, RiskDomain::Fall)?,
            respiratory: Self::load_domain(store, RiskDomain::Respiratory)?,
        };

        tracing::info!("Model registry ready ({} domains)", RiskDomain::ALL.len());
        Ok(registry)
    }

    /// Assemble a registry from already-decoded artifacts.
    ///
    /// # Errors
    /// Returns `ArtifactLoadError::SchemaMismatch` if any artifact does not fit
    /// its domain schema.
    pub fn from_artifacts(
        cardiac: ModelArtifacts,
        fall: ModelArtifacts,
        respiratory: ModelArtifacts,
    ) -> Result<Self, ArtifactLoadError> {
        Self::check_schema(RiskDomain::Cardiac, &cardiac)?;
        Self::check_schema(RiskDomain::Fall, &fall)?;
        Self::check_schema(RiskDomain::Respiratory, &respiratory)?;
        Ok(Self {
            cardiac,
            fall,
            respiratory,
        })
    }

    fn load_domain<S>(store: &S, domain: RiskDomain) -> Result<ModelArtifacts, ArtifactLoadError>
    where
        S: ArtifactStore + ?Sized,
    {
        let artifacts = store.load(domain).map_err(|e| {
            tracing::error!("Failed to load {} artifacts: {}", domain, e);
            e
        })?;
        Self::check_schema(domain, &artifacts)?;
        tracing::info!(
            "Loaded {} model ({} features)",
            domain,
            domain.schema().arity()
        );
        Ok(artifacts)
    }

    /// Check arity and, when the artifact declares them, feature names.
    fn check_schema(domain: RiskDomain, artifacts: &ModelArtifacts) -> Result<(), ArtifactLoadError> {
        let schema = domain.schema();
        let declared = [
            (
                ArtifactKind::Scaler,
                artifacts.scaler.n_features(),
                artifacts.scaler.feature_names(),
            ),
            (
                ArtifactKind::Model,
                artifacts.model.n_features(),
                artifacts.model.feature_names(),
            ),
        ];

        for (kind, n_features, names) in declared {
            let arity_ok = n_features == schema.arity();
            let names_ok = names.map_or(true, |names| schema.matches(names));
            if arity_ok && names_ok {
                continue;
            }

            let found = match names {
                Some(names) => names.to_vec(),
                None => vec![format!("<{n_features} unnamed features>")],
            };
            return Err(ArtifactLoadError::SchemaMismatch {
                domain,
                kind,
                expected: schema.names().into_iter().map(String::from).collect(),
                found,
            });
        }

        Ok(())
    }

    /// Artifacts for one domain.
    #[must_use]
    pub fn get(&self, domain: RiskDomain) -> &ModelArtifacts {
        match domain {
            RiskDomain::Cardiac => &self.cardiac,
            RiskDomain::Fall => &self.fall,
            RiskDomain::Respiratory => &self.respiratory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs_store::test_support::write_constant_artifacts;
    use crate::adapters::{FsArtifactStore, IntegrityPolicy};
    use crate::application::test_support::{artifacts, named_artifacts};
    use tempfile::tempdir;

    #[test]
    fn test_load_from_store() {
        let temp = tempdir().expect("tempdir");
        write_constant_artifacts(temp.path(), -2.0);
        let store = FsArtifactStore::open(temp.path(), &IntegrityPolicy::default())
            .expect("Should open");

        let registry = ModelRegistry::load(&store).expect("Should load");
        for domain in RiskDomain::ALL {
            assert_eq!(
                registry.get(domain).scaler.n_features(),
                domain.schema().arity()
            );
        }
    }

    #[test]
    fn test_missing_fall_artifact_fails_whole_registry() {
        let temp = tempdir().expect("tempdir");
        write_constant_artifacts(temp.path(), -2.0);
        std::fs::remove_file(temp.path().join("fall_scaler.json")).expect("remove");
        let store = FsArtifactStore::open(temp.path(), &IntegrityPolicy::default())
            .expect("Should open");

        let err = ModelRegistry::load(&store).expect_err("must fail");
        assert!(matches!(
            err,
            ArtifactLoadError::Missing {
                domain: RiskDomain::Fall,
                ..
            }
        ));
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let err = ModelRegistry::from_artifacts(artifacts(6, 0.1), artifacts(6, 0.1), artifacts(3, 0.1))
            .expect_err("fall expects 3 features");
        assert!(matches!(
            err,
            ArtifactLoadError::SchemaMismatch {
                domain: RiskDomain::Fall,
                kind: ArtifactKind::Scaler,
                ..
            }
        ));
    }

    #[test]
    fn test_feature_order_mismatch_is_rejected() {
        // Respiratory fitted as [avgHeartRate, minSpO2, recordCount] instead of
        // [minSpO2, avgHeartRate, recordCount].
        let swapped = named_artifacts(&["avgHeartRate", "minSpO2", "recordCount"], 0.1);
        let err = ModelRegistry::from_artifacts(artifacts(6, 0.1), artifacts(3, 0.1), swapped)
            .expect_err("must fail");
        match err {
            ArtifactLoadError::SchemaMismatch {
                domain, expected, ..
            } => {
                assert_eq!(domain, RiskDomain::Respiratory);
                assert_eq!(expected, vec!["minSpO2", "avgHeartRate", "recordCount"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_matching_names_are_accepted() {
        let respiratory = named_artifacts(&["minSpO2", "avgHeartRate", "recordCount"], 0.1);
        ModelRegistry::from_artifacts(artifacts(6, 0.1), artifacts(3, 0.1), respiratory)
            .expect("Should accept");
    }
}
