//! Runtime configuration from environment variables.
//!
//! Parsing is best-effort: unset or unparseable values fall back to defaults.
//!
//! Supported:
//! - `GERIRISK_MODEL_DIR` (default `ml/models`)
//! - `GERIRISK_REQUIRE_SIGNED_MODELS`
//! - `GERIRISK_MODEL_PUBKEY_B64` / `GERIRISK_MODEL_PUBKEY_B64_FILE`
//! - `GERIRISK_PARALLEL_DOMAINS`
//! - `GERIRISK_LOG_MODE` (`stderr` | `file`) and `GERIRISK_LOG_FILE`

use std::path::PathBuf;

use crate::adapters::IntegrityPolicy;
use crate::GeririskError;

const MODEL_DIR_ENV: &str = "GERIRISK_MODEL_DIR";
const REQUIRE_SIGNED_ENV: &str = "GERIRISK_REQUIRE_SIGNED_MODELS";
const PUBKEY_B64_ENV: &str = "GERIRISK_MODEL_PUBKEY_B64";
const PUBKEY_FILE_ENV: &str = "GERIRISK_MODEL_PUBKEY_B64_FILE";
const PARALLEL_ENV: &str = "GERIRISK_PARALLEL_DOMAINS";
const LOG_MODE_ENV: &str = "GERIRISK_LOG_MODE";
const LOG_FILE_ENV: &str = "GERIRISK_LOG_FILE";

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

/// Where log output goes. Stdout is reserved for the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File,
}

/// Process configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub model_dir: PathBuf,
    pub require_signed_models: bool,
    pub model_pubkey_b64: Option<String>,
    pub model_pubkey_file: Option<PathBuf>,
    pub parallel_domains: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("ml/models"),
            require_signed_models: false,
            model_pubkey_b64: None,
            model_pubkey_file: None,
            parallel_domains: false,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from("geririsk.log"),
        }
    }
}

impl AppConfig {
    /// Load config overrides from the process environment.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config overrides from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(MODEL_DIR_ENV) {
            cfg.model_dir = PathBuf::from(v.trim());
        }
        if let Some(v) = non_empty(REQUIRE_SIGNED_ENV) {
            cfg.require_signed_models = parse_bool(&v);
        }
        cfg.model_pubkey_b64 = non_empty(PUBKEY_B64_ENV).map(|v| v.trim().to_string());
        cfg.model_pubkey_file = non_empty(PUBKEY_FILE_ENV).map(|v| PathBuf::from(v.trim()));
        if let Some(v) = non_empty(PARALLEL_ENV) {
            cfg.parallel_domains = parse_bool(&v);
        }
        if let Some(v) = non_empty(LOG_MODE_ENV) {
            match v.trim() {
                "file" => cfg.log_mode = LogMode::File,
                "stderr" => cfg.log_mode = LogMode::Stderr,
                _ => {}
            }
        }
        if let Some(v) = non_empty(LOG_FILE_ENV) {
            cfg.log_file = PathBuf::from(v.trim());
        }

        cfg
    }

    /// Build the artifact integrity policy, resolving the verifying key.
    ///
    /// An inline key takes precedence over a key file.
    ///
    /// # Errors
    /// Returns `GeririskError::Config` if the key file cannot be read, or
    /// `GeririskError::ArtifactLoad` if the key is malformed.
    pub fn integrity_policy(&self) -> Result<IntegrityPolicy, GeririskError> {
        let b64 = match (&self.model_pubkey_b64, &self.model_pubkey_file) {
            (Some(inline), _) => Some(inline.clone()),
            (None, Some(path)) => Some(std::fs::read_to_string(path).map_err(|e| {
                GeririskError::Config(format!("failed reading public key file {path:?}: {e}"))
            })?),
            (None, None) => None,
        };

        let verifying_key = b64
            .as_deref()
            .map(IntegrityPolicy::verifying_key_from_b64)
            .transpose()?;

        Ok(IntegrityPolicy {
            require_signed: self.require_signed_models,
            verifying_key,
        })
    }
}
