//! # wfsl-proofgate
//!
//! Release gate for WFSL artifacts: a proof manifest names a message, its
//! detached Ed25519 signature and the public key. Before the signature is
//! checked, an optional repo guard confirms the repository is in a
//! publishable state (tracked `.gitignore`, lockfile in sync, build output
//! not committed).
//!
//! ```text
//! manifest ──load──▶ repo guard ──VALID──▶ external verifier? ──▶ Ed25519
//!                        │                        │ ill-formed      ▲
//!                        ▼ INVALID                └─────────────────┘
//!                  REPO_GUARD_FAILED
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod manifest;
pub mod repo_guard;
pub mod verify;

use std::path::Path;

use tracing::info;

pub use error::{ExitCode, ProofgateError};
pub use manifest::{load_manifest, LoadedManifest, ProofManifest, RepoGuardPolicy};
pub use repo_guard::{run_repo_guard, GitCli, GitProbe, RepoGuardVerdict};
pub use verify::{
    verify_direct, verify_manifest, CommandVerifier, ExternalVerifier, VerifyOptions,
    VerifyReport, VerifyResult,
};

/// Load a manifest, enforce its repo guard, then verify it.
///
/// A guard violation is [`ProofgateError::RepoGuard`] and a signature
/// mismatch is [`ProofgateError::VerifyFailed`].
pub fn verify_gated(
    manifest_path: &Path,
    options: &VerifyOptions<'_>,
    git: &dyn GitProbe,
) -> Result<VerifyReport, ProofgateError> {
    let loaded = load_manifest(manifest_path)?;

    let verdict = run_repo_guard(&loaded, git)?;
    if !verdict.is_valid() {
        return Err(ProofgateError::RepoGuard(Box::new(verdict)));
    }

    let report = verify_manifest(&loaded, options)?.into_verified()?;
    info!(manifest = %loaded.path.display(), verifier = ?report.verifier, "Manifest verified");
    Ok(report)
}
