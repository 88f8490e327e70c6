//! Repo guard gating and external verifier fallback.

use std::path::Path;

use serde_json::{json, Value};
use wfsl_proofgate::repo_guard::{BuildOutputStatus, GitignoreStatus};
use wfsl_proofgate::verify::VerifierKind;
use wfsl_proofgate::{
    load_manifest, run_repo_guard, verify_gated, verify_manifest, ExternalVerifier, GitProbe,
    ProofgateError, VerifyOptions,
};

use crate::Fixture;

struct NothingTracked;

impl GitProbe for NothingTracked {
    fn is_tracked(&self, _: &Path, _: &str) -> bool {
        false
    }

    fn tracks_any(&self, _: &Path, _: &str) -> bool {
        false
    }
}

struct EverythingTracked;

impl GitProbe for EverythingTracked {
    fn is_tracked(&self, _: &Path, _: &str) -> bool {
        true
    }

    fn tracks_any(&self, _: &Path, _: &str) -> bool {
        true
    }
}

struct Canned(Result<Value, &'static str>);

impl ExternalVerifier for Canned {
    fn name(&self) -> &str {
        "canned"
    }

    fn verify(&self, _: &Path) -> Result<Value, ProofgateError> {
        self.0
            .clone()
            .map_err(|e| ProofgateError::ExternalVerifier(e.to_string()))
    }
}

fn guarded_manifest(fx: &Fixture) -> std::path::PathBuf {
    let mut manifest = fx.file_manifest();
    manifest["repoGuard"] = json!({
        "git": { "requireGitignore": true },
        "build": { "output": "dist", "tracked": false }
    });
    fx.write(".gitignore", "dist/\n");
    fx.write_manifest(&manifest)
}

#[test]
fn test_unguarded_manifest_passes_gate() {
    let fx = Fixture::new();
    let path = fx.write_manifest(&fx.file_manifest());
    let report = verify_gated(&path, &VerifyOptions::default(), &NothingTracked).unwrap();
    assert_eq!(report.result.reason, "verified");
}

#[test]
fn test_guard_violation_blocks_verification() {
    let fx = Fixture::new();
    let path = guarded_manifest(&fx);

    // Gitignore untracked.
    let err = verify_gated(&path, &VerifyOptions::default(), &NothingTracked).unwrap_err();
    let ProofgateError::RepoGuard(verdict) = &err else {
        panic!("expected repo guard failure, got {err}");
    };
    assert_eq!(verdict.gitignore, GitignoreStatus::Untracked);
    assert_eq!(verdict.build_output, BuildOutputStatus::Ignored);
    assert_eq!(err.exit_code().code(), 20);

    // Gitignore tracked, but so is the build output.
    let err = verify_gated(&path, &VerifyOptions::default(), &EverythingTracked).unwrap_err();
    let ProofgateError::RepoGuard(verdict) = err else {
        panic!("expected repo guard failure");
    };
    assert_eq!(verdict.violations, ["build output 'dist' is tracked but must be ignored"]);
}

#[test]
fn test_guard_checks_run_in_manifest_directory() {
    let fx = Fixture::new();
    let path = guarded_manifest(&fx);
    std::fs::remove_file(fx.path(".gitignore")).unwrap();

    let verdict = run_repo_guard(&load_manifest(&path).unwrap(), &EverythingTracked).unwrap();
    assert_eq!(verdict.gitignore, GitignoreStatus::Missing);
    assert!(!verdict.is_valid());
}

#[test]
fn test_well_formed_external_result_is_authoritative() {
    let fx = Fixture::new();
    let path = fx.write_manifest(&fx.file_manifest());
    let external = Canned(Ok(json!({ "ok": false, "reason": "revoked key", "details": {} })));

    let options = VerifyOptions {
        external: Some(&external),
        ..VerifyOptions::default()
    };
    let report = verify_manifest(&load_manifest(&path).unwrap(), &options).unwrap();
    assert_eq!(report.verifier, VerifierKind::External);
    assert!(!report.result.ok);
    assert_eq!(report.result.reason, "revoked key");
}

#[test]
fn test_ill_formed_external_result_falls_back() {
    let fx = Fixture::new();
    let path = fx.write_manifest(&fx.file_manifest());
    let loaded = load_manifest(&path).unwrap();

    for external in [
        Canned(Ok(json!({ "ok": "yes", "reason": "verified" }))),
        Canned(Ok(json!({ "ok": true }))),
        Canned(Err("verifier crashed")),
    ] {
        let options = VerifyOptions {
            external: Some(&external),
            ..VerifyOptions::default()
        };
        let report = verify_manifest(&loaded, &options).unwrap();
        assert_eq!(report.verifier, VerifierKind::Builtin);
        assert!(report.result.ok);
        assert!(report.external_failure.is_some());
    }
}
