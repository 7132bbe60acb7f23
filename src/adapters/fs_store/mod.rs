//! File-system artifact store.
//!
//! Reads per-domain JSON artifacts from a model directory:
//!
//! ```text
//! <model_dir>/
//!   cardiac_scaler.json        cardiac_risk_model.json
//!   fall_scaler.json           fall_risk_model.json
//!   respiratory_scaler.json    respiratory_risk_model.json
//!   manifest.json              (optional, signed)
//!   model.sig                  (optional, Ed25519 over manifest.json)
//! ```
//!
//! # Integrity
//!
//! When `manifest.json` and `model.sig` are present, the manifest signature is
//! verified against the configured Ed25519 key when the store is opened, and
//! every artifact read afterwards must be listed in the manifest with a
//! matching SHA-256 digest. Hashes are checked on the exact bytes that get
//! decoded.
//!
//! Without a manifest, loading is refused if `require_signed` is set and
//! otherwise proceeds with a warning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::linear::{LogisticModel, StandardScaler};
use crate::domain::RiskDomain;
use crate::ports::{ArtifactKind, ArtifactLoadError, ArtifactStore, ModelArtifacts};

/// Signed manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Detached Ed25519 signature over the manifest bytes.
pub const SIGNATURE_FILE: &str = "model.sig";

/// Manifest format version understood by this build.
pub const MANIFEST_VERSION: u32 = 1;

/// Allowed clock skew for manifest creation timestamps, in seconds.
const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// File name of one artifact inside the model directory.
#[must_use]
pub fn artifact_file_name(domain: RiskDomain, kind: ArtifactKind) -> String {
    match kind {
        ArtifactKind::Scaler => format!("{domain}_scaler.json"),
        ArtifactKind::Model => format!("{domain}_risk_model.json"),
    }
}

/// Lowercase hex SHA-256 of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Seconds since the Unix epoch, or 0 if the clock is before it.
#[must_use]
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Signed list of artifact digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    /// Monotonic release number chosen by the signer.
    #[serde(default)]
    pub serial: u64,
    /// Unix timestamp (seconds) when the manifest was created.
    #[serde(default)]
    pub created_at: i64,
    /// Artifact file name to lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

impl ModelManifest {
    fn validate(&self) -> Result<(), ArtifactLoadError> {
        if self.version != MANIFEST_VERSION {
            return Err(ArtifactLoadError::Integrity(format!(
                "unsupported manifest version {}",
                self.version
            )));
        }
        if self.created_at > unix_now() + MAX_CLOCK_SKEW_SECS {
            return Err(ArtifactLoadError::Integrity(
                "manifest created_at is in the future".into(),
            ));
        }
        if self.files.is_empty() {
            return Err(ArtifactLoadError::Integrity(
                "manifest lists no files".into(),
            ));
        }
        Ok(())
    }
}

/// How strictly artifact integrity is enforced.
#[derive(Debug, Clone, Default)]
pub struct IntegrityPolicy {
    /// Refuse directories without a signed manifest.
    pub require_signed: bool,
    /// Key used to verify `model.sig`.
    pub verifying_key: Option<VerifyingKey>,
}

impl IntegrityPolicy {
    /// Decode a base64 Ed25519 public key.
    ///
    /// # Errors
    /// Returns `ArtifactLoadError::Integrity` if the key is malformed.
    pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactLoadError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|_| ArtifactLoadError::Integrity("invalid public key base64".into()))?;
        let raw: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            ArtifactLoadError::Integrity(format!(
                "invalid public key length {} (expected 32 bytes)",
                bytes.len()
            ))
        })?;
        VerifyingKey::from_bytes(&raw)
            .map_err(|_| ArtifactLoadError::Integrity("invalid verifying key".into()))
    }
}

/// Artifact store backed by a local directory.
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    manifest: Option<ModelManifest>,
}

impl FsArtifactStore {
    /// Open a model directory, verifying its signed manifest if present.
    ///
    /// # Errors
    /// Returns error if the directory is missing or the manifest fails
    /// verification under `policy`.
    pub fn open(root: impl AsRef<Path>, policy: &IntegrityPolicy) -> Result<Self, ArtifactLoadError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ArtifactLoadError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("model directory {root:?} does not exist"),
            )));
        }

        let manifest = Self::verify_manifest(&root, policy)?;
        Ok(Self { root, manifest })
    }

    /// Whether artifacts are checked against a signed manifest.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.manifest.is_some()
    }

    fn verify_manifest(
        root: &Path,
        policy: &IntegrityPolicy,
    ) -> Result<Option<ModelManifest>, ArtifactLoadError> {
        let sig_path = root.join(SIGNATURE_FILE);
        let manifest_path = root.join(MANIFEST_FILE);

        if !sig_path.exists() || !manifest_path.exists() {
            if policy.require_signed {
                tracing::error!("Signed manifest required but not found in {:?}", root);
                return Err(ArtifactLoadError::Integrity(format!(
                    "{MANIFEST_FILE} and {SIGNATURE_FILE} are required in {root:?}"
                )));
            }
            tracing::warn!("Loading UNSIGNED model artifacts from {:?}", root);
            return Ok(None);
        }

        let key = policy.verifying_key.as_ref().ok_or_else(|| {
            ArtifactLoadError::Integrity(
                "signed manifest present but no verifying key is configured".into(),
            )
        })?;

        let sig_bytes = fs::read(&sig_path)?;
        let sig_array: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
            ArtifactLoadError::Integrity("invalid signature length (expected 64 bytes)".into())
        })?;
        let signature = Signature::from_bytes(&sig_array);

        let manifest_bytes = fs::read(&manifest_path)?;
        key.verify(&manifest_bytes, &signature)
            .map_err(|_| ArtifactLoadError::Integrity("invalid manifest signature".into()))?;

        let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes).map_err(|e| {
            ArtifactLoadError::Integrity(format!("invalid {MANIFEST_FILE} format: {e}"))
        })?;
        manifest.validate()?;

        tracing::info!(
            "Verified model manifest (serial={}, files={})",
            manifest.serial,
            manifest.files.len()
        );
        Ok(Some(manifest))
    }

    /// Read one artifact, enforcing the manifest digest when signed.
    fn read_artifact(
        &self,
        domain: RiskDomain,
        kind: ArtifactKind,
    ) -> Result<Vec<u8>, ArtifactLoadError> {
        let name = artifact_file_name(domain, kind);
        let path = self.root.join(&name);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactLoadError::Missing {
                    domain,
                    kind,
                    location: path.display().to_string(),
                });
            }
            Err(e) => return Err(ArtifactLoadError::Io(e)),
        };

        if let Some(manifest) = &self.manifest {
            let expected = manifest.files.get(&name).ok_or_else(|| {
                ArtifactLoadError::Integrity(format!("{name} is not bound by {MANIFEST_FILE}"))
            })?;
            if !constant_time_eq_str(&sha256_hex(&bytes), expected) {
                return Err(ArtifactLoadError::Integrity(format!(
                    "hash mismatch for {name}"
                )));
            }
        }

        Ok(bytes)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load(&self, domain: RiskDomain) -> Result<ModelArtifacts, ArtifactLoadError> {
        let corrupt = |kind, reason| ArtifactLoadError::Corrupt {
            domain,
            kind,
            reason,
        };

        let scaler_bytes = self.read_artifact(domain, ArtifactKind::Scaler)?;
        let scaler = StandardScaler::from_json_slice(&scaler_bytes)
            .map_err(|e| corrupt(ArtifactKind::Scaler, e))?;

        let model_bytes = self.read_artifact(domain, ArtifactKind::Model)?;
        let model = LogisticModel::from_json_slice(&model_bytes)
            .map_err(|e| corrupt(ArtifactKind::Model, e))?;

        tracing::debug!(
            "Decoded {} artifacts ({} features, calibrated={})",
            domain,
            model.coefficients.len(),
            model.calibration.is_some()
        );

        Ok(ModelArtifacts::new(Arc::new(scaler), Arc::new(model)))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for writing artifact directories in tests.

    use std::path::Path;

    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use serde_json::json;

    use super::*;

    /// Write scaler and model for every domain. Each model has zero weights
    /// and the given intercept, so it predicts `sigmoid(intercept)` for any input.
    pub fn write_constant_artifacts(dir: &Path, intercept: f64) {
        for domain in RiskDomain::ALL {
            let names = domain.schema().names();
            let n = names.len();
            let scaler = json!({
                "feature_names": names,
                "mean": vec![0.0; n],
                "scale": vec![1.0; n],
            });
            let model = json!({
                "feature_names": names,
                "coefficients": vec![0.0; n],
                "intercept": intercept,
            });
            fs::write(
                dir.join(artifact_file_name(domain, ArtifactKind::Scaler)),
                serde_json::to_vec(&scaler).expect("serialize scaler"),
            )
            .expect("write scaler");
            fs::write(
                dir.join(artifact_file_name(domain, ArtifactKind::Model)),
                serde_json::to_vec(&model).expect("serialize model"),
            )
            .expect("write model");
        }
    }

    pub fn random_signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    /// Sign a manifest binding every artifact currently in `dir`.
    pub fn sign_dir(dir: &Path, signing_key: &SigningKey) {
        let mut files = BTreeMap::new();
        for domain in RiskDomain::ALL {
            for kind in ArtifactKind::ALL {
                let name = artifact_file_name(domain, kind);
                let bytes = fs::read(dir.join(&name)).expect("read artifact");
                files.insert(name, sha256_hex(&bytes));
            }
        }
        let manifest = ModelManifest {
            version: MANIFEST_VERSION,
            serial: 1,
            created_at: unix_now(),
            files,
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest).expect("serialize manifest");
        fs::write(dir.join(MANIFEST_FILE), &manifest_bytes).expect("write manifest");
        let signature: Signature = signing_key.sign(&manifest_bytes);
        fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes()).expect("write signature");
    }
}
