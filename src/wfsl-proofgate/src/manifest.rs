//! Proof manifest model.
//!
//! A manifest names a message file, its detached Ed25519 signature and the
//! public key, each either as a file relative to the manifest or inline as
//! base64. An optional `repoGuard` block turns on repository hygiene checks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::ProofgateError;

/// Parsed proof manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofManifest {
    /// Message file, relative to the manifest directory.
    #[serde(default)]
    pub message_file: Option<String>,
    /// Signature file holding base64, relative to the manifest directory.
    #[serde(default)]
    pub signature_file: Option<String>,
    /// Inline base64 signature.
    #[serde(default)]
    pub signature_b64: Option<String>,
    /// Public key file holding base64, relative to the manifest directory.
    #[serde(default)]
    pub public_key_file: Option<String>,
    /// Inline base64 public key.
    #[serde(default)]
    pub public_key_b64: Option<String>,
    /// Repository hygiene policy. Anything other than an object is ignored.
    #[serde(default, deserialize_with = "object_or_none")]
    pub repo_guard: Option<RepoGuardPolicy>,
}

/// `repoGuard` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoGuardPolicy {
    /// Git checks.
    #[serde(default, deserialize_with = "object_or_none")]
    pub git: Option<GitPolicy>,
    /// Dependency lockfile checks.
    #[serde(default, deserialize_with = "object_or_none")]
    pub dependencies: Option<DependencyPolicy>,
    /// Build output tracking checks.
    #[serde(default, deserialize_with = "object_or_none")]
    pub build: Option<BuildPolicy>,
}

/// `repoGuard.git`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitPolicy {
    /// Require a tracked `.gitignore`. Only a literal `true` enables it.
    #[serde(default, deserialize_with = "bool_or_none")]
    pub require_gitignore: Option<bool>,
}

/// `repoGuard.dependencies`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyPolicy {
    /// Require `package-lock.json` to agree with `package.json`.
    #[serde(default, deserialize_with = "bool_or_none")]
    pub lockfile_required: Option<bool>,
}

/// `repoGuard.build`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildPolicy {
    /// Build output path, relative to the manifest directory.
    #[serde(default, deserialize_with = "string_or_none")]
    pub output: Option<String>,
    /// Whether the output is expected to be committed.
    #[serde(default, deserialize_with = "bool_or_none")]
    pub tracked: Option<bool>,
}

impl RepoGuardPolicy {
    pub(crate) fn requires_gitignore(&self) -> bool {
        self.git.as_ref().and_then(|g| g.require_gitignore) == Some(true)
    }

    pub(crate) fn requires_lockfile(&self) -> bool {
        self.dependencies.as_ref().and_then(|d| d.lockfile_required) == Some(true)
    }

    /// Output path and expected tracking, when both are set.
    pub(crate) fn build_expectation(&self) -> Option<(&str, bool)> {
        let build = self.build.as_ref()?;
        Some((build.output.as_deref()?, build.tracked?))
    }
}

fn object_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        v @ Value::Object(_) => serde_json::from_value(v)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn bool_or_none<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_bool())
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// A manifest together with the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Absolute manifest path.
    pub path: PathBuf,
    /// Directory containing the manifest.
    pub base_dir: PathBuf,
    /// Parsed content.
    pub manifest: ProofManifest,
}

impl LoadedManifest {
    /// Resolve a manifest-relative path.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }
}

/// Resolve `path` against the current directory when relative.
pub fn absolutize(path: &Path) -> Result<PathBuf, ProofgateError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| ProofgateError::Internal(format!("cannot determine working directory: {e}")))
}

/// Read and parse a manifest.
pub fn load_manifest(path: &Path) -> Result<LoadedManifest, ProofgateError> {
    let path = absolutize(path)?;
    let raw = std::fs::read(&path).map_err(|_| ProofgateError::not_found("manifest", &path))?;
    let manifest: ProofManifest =
        serde_json::from_slice(&raw).map_err(|e| ProofgateError::parse("manifest", e))?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    debug!(
        manifest = %path.display(),
        guarded = manifest.repo_guard.is_some(),
        "Loaded proof manifest"
    );

    Ok(LoadedManifest {
        path,
        base_dir,
        manifest,
    })
}
