//! Signs a geririsk model directory.
//!
//! Writes `manifest.json` binding the SHA-256 of all six per-domain artifacts
//! and `model.sig`, an Ed25519 signature over the manifest bytes.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_model -- <model_dir> [--serial <n>]
//! ```
//!
//! The signing seed (base64, 32 bytes) is read from, in order:
//! `GERIRISK_MODEL_SIGNING_KEY_B64_FD`, `GERIRISK_MODEL_SIGNING_KEY_B64_FILE`,
//! `/run/secrets/geririsk_model_signing_key_b64`, and in debug builds only
//! `GERIRISK_MODEL_SIGNING_KEY_B64`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
#[cfg(unix)]
use std::os::unix::io::FromRawFd;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use geririsk::adapters::fs_store::{
    artifact_file_name, sha256_hex, unix_now, ModelManifest, MANIFEST_FILE, MANIFEST_VERSION,
    SIGNATURE_FILE,
};
use geririsk::domain::RiskDomain;
use geririsk::ports::ArtifactKind;

const KEY_FD_ENV: &str = "GERIRISK_MODEL_SIGNING_KEY_B64_FD";
const KEY_FILE_ENV: &str = "GERIRISK_MODEL_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "GERIRISK_MODEL_SIGNING_KEY_B64";
const DOCKER_SECRET_PATH: &str = "/run/secrets/geririsk_model_signing_key_b64";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn non_empty_secret(raw: &str) -> Result<Zeroizing<String>> {
    let secret = Zeroizing::new(raw.trim_end_matches(['\n', '\r']).to_string());
    if secret.is_empty() {
        bail!("Empty signing key");
    }
    Ok(secret)
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    #[cfg(unix)]
    if let Ok(fd_str) = env::var(KEY_FD_ENV) {
        let fd: i32 = fd_str.trim().parse().context("Invalid key FD")?;
        if fd <= 2 {
            bail!("Refusing to read signing key from stdio FD");
        }
        // SAFETY: take ownership of FD for one-time secret read.
        let mut file = unsafe { fs::File::from_raw_fd(fd) };
        let mut buf = Zeroizing::new(String::new());
        use std::io::Read;
        file.read_to_string(&mut buf)
            .context("Failed reading signing key from FD")?;
        return non_empty_secret(&buf);
    }

    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        );
        return non_empty_secret(&content);
    }

    if Path::new(DOCKER_SECRET_PATH).exists() {
        let content = Zeroizing::new(
            fs::read_to_string(DOCKER_SECRET_PATH).context("Failed reading docker secret")?,
        );
        return non_empty_secret(&content);
    }

    // Dev-only fallback.
    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(KEY_ENV) {
            return non_empty_secret(&Zeroizing::new(v));
        }
    }

    Err(anyhow!(
        "Missing signing key. Provide one of: {KEY_FD_ENV}, {KEY_FILE_ENV}, or {DOCKER_SECRET_PATH} (env var fallback only in debug builds)."
    ))
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Invalid base64 in signing key")?,
    );

    if raw.len() != 32 {
        bail!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }

    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

const USAGE: &str = "Usage: sign_model <model_dir> [--serial <u64>]";

fn usage() -> anyhow::Error {
    anyhow!(USAGE)
}

/// Returns `None` when help was requested.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<(PathBuf, Option<u64>)>> {
    let mut model_dir: Option<PathBuf> = None;
    let mut serial: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--serial" => {
                let v = args.next().ok_or_else(usage)?;
                serial = Some(v.trim().parse().context("--serial must be a u64")?);
            }
            "-h" | "--help" => {
                println!("{USAGE}\n\nWrites {MANIFEST_FILE} and {SIGNATURE_FILE} into <model_dir>. The signing seed is read from {KEY_FD_ENV}, {KEY_FILE_ENV} or {DOCKER_SECRET_PATH}.");
                return Ok(None);
            }
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }

    Ok(Some((model_dir.ok_or_else(usage)?, serial)))
}

/// Digest every domain artifact; all six must exist.
fn collect_digests(model_dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for domain in RiskDomain::ALL {
        for kind in ArtifactKind::ALL {
            let name = artifact_file_name(domain, kind);
            let path = model_dir.join(&name);
            let bytes = fs::read(&path).with_context(|| format!("Failed to read {path:?}"))?;
            files.insert(name, sha256_hex(&bytes));
        }
    }
    Ok(files)
}

fn main() -> Result<()> {
    let Some((model_dir, serial_arg)) = parse_args(env::args().skip(1))? else {
        return Ok(());
    };
    if !model_dir.is_dir() {
        bail!("{model_dir:?} is not a directory");
    }

    let files = collect_digests(&model_dir)?;

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let created_at = unix_now();
    let serial = serial_arg.unwrap_or(if created_at > 0 { created_at as u64 } else { 1 });

    let manifest = ModelManifest {
        version: MANIFEST_VERSION,
        serial,
        created_at,
        files,
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let signature: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, signature.to_bytes())
        .with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?} (serial {serial})");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "GERIRISK_MODEL_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );

    Ok(())
}
