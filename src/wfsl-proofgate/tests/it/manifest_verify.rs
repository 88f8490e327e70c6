//! Input resolution and built-in verification from manifests.

use std::process::Command;

use proptest::prelude::*;
use serde_json::json;
use wfsl_crypto::{encode_base64, DetachedSigner, Ed25519Signer};
use wfsl_proofgate::verify::{resolve_inputs, verify_detached, VerifierKind};
use wfsl_proofgate::{load_manifest, verify_direct, verify_manifest, ProofgateError, VerifyOptions};

use crate::Fixture;

#[test]
fn test_file_manifest_verifies() {
    let fx = Fixture::new();
    let path = fx.write_manifest(&fx.file_manifest());

    let report = verify_manifest(&load_manifest(&path).unwrap(), &VerifyOptions::default()).unwrap();
    assert!(report.result.ok);
    assert_eq!(report.verifier, VerifierKind::Builtin);
    assert!(report.external_failure.is_none());
}

#[test]
fn test_inline_manifest_verifies() {
    let fx = Fixture::new();
    let path = fx.write_manifest(&json!({
        "messageFile": "message.bin",
        "signatureB64": format!("  {}  ", fx.signature_b64()),
        "publicKeyB64": fx.public_key_b64().trim_end_matches('='),
    }));

    let report = verify_manifest(&load_manifest(&path).unwrap(), &VerifyOptions::default()).unwrap();
    assert!(report.result.ok);
}

#[test]
fn test_file_base64_is_cleansed() {
    let fx = Fixture::new();
    let manifest = fx.file_manifest();
    let sig = fx.signature_b64();
    let (a, b) = sig.split_at(40);
    fx.write("message.sig", format!("-----\r\n{a}\n  {b}\r\n"));
    let path = fx.write_manifest(&manifest);

    let report = verify_manifest(&load_manifest(&path).unwrap(), &VerifyOptions::default()).unwrap();
    assert!(report.result.ok);
}

#[test]
fn test_file_takes_precedence_over_inline() {
    let fx = Fixture::new();
    let mut manifest = fx.file_manifest();
    manifest["signatureB64"] = json!("garbage");
    manifest["publicKeyB64"] = json!("garbage");
    let path = fx.write_manifest(&manifest);

    let inputs = resolve_inputs(&load_manifest(&path).unwrap(), None).unwrap();
    assert_eq!(inputs.message, Fixture::MESSAGE);
    assert_eq!(inputs.public_key.len(), 32);
}

#[test]
fn test_override_key_takes_precedence() {
    let fx = Fixture::new();
    let path = fx.write_manifest(&fx.file_manifest());
    let other = Ed25519Signer::random();
    let override_key = fx.write("other.pub", encode_base64(other.public_key()));

    let loaded = load_manifest(&path).unwrap();
    let options = VerifyOptions {
        public_key_override: Some(override_key),
        ..VerifyOptions::default()
    };
    let report = verify_manifest(&loaded, &options).unwrap();
    assert!(!report.result.ok);
    assert_eq!(report.result.reason, "signature verification failed");
    assert!(matches!(
        report.into_verified().unwrap_err(),
        ProofgateError::VerifyFailed { .. }
    ));
}

#[test]
fn test_relative_override_key_resolves_against_working_directory() {
    let fx = Fixture::new();
    let path = fx.write_manifest(&fx.file_manifest());
    let cwd = tempfile::tempdir().unwrap();
    let stranger = encode_base64(Ed25519Signer::random().public_key());

    let run = |cwd: &std::path::Path| {
        Command::new(env!("CARGO_BIN_EXE_wfsl-proofgate"))
            .current_dir(cwd)
            .args(["verify", "--manifest"])
            .arg(&path)
            .args(["--public-key", "override.pub"])
            .output()
            .unwrap()
    };

    // Same file name next to the manifest holds the wrong key; the one in
    // the working directory is the signer's.
    fx.write("override.pub", &stranger);
    std::fs::write(cwd.path().join("override.pub"), fx.public_key_b64()).unwrap();
    let out = run(cwd.path());
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "OK: verified");

    fx.write("override.pub", fx.public_key_b64());
    std::fs::write(cwd.path().join("override.pub"), &stranger).unwrap();
    assert_eq!(run(cwd.path()).status.code(), Some(20));
}

#[test]
fn test_missing_inputs_are_not_found() {
    let fx = Fixture::new();

    let path = fx.write_manifest(&json!({ "signatureB64": fx.signature_b64() }));
    let err = verify_manifest(&load_manifest(&path).unwrap(), &VerifyOptions::default()).unwrap_err();
    assert!(matches!(err, ProofgateError::MissingInput(_)));
    assert_eq!(err.exit_code().code(), 40);

    let path = fx.write_manifest(&json!({
        "messageFile": "absent.bin",
        "signatureB64": fx.signature_b64(),
        "publicKeyB64": fx.public_key_b64(),
    }));
    let err = verify_manifest(&load_manifest(&path).unwrap(), &VerifyOptions::default()).unwrap_err();
    assert!(matches!(err, ProofgateError::NotFound { ref label, .. } if label == "messageFile"));

    let path = fx.write_manifest(&json!({
        "messageFile": "message.bin",
        "signatureB64": fx.signature_b64(),
    }));
    let err = verify_manifest(&load_manifest(&path).unwrap(), &VerifyOptions::default()).unwrap_err();
    assert_eq!(err.exit_code().code(), 40);
}

#[test]
fn test_malformed_inputs_are_invalid() {
    let fx = Fixture::new();
    let path = fx.write_manifest(&json!({
        "messageFile": "message.bin",
        "signatureB64": "not*base64",
        "publicKeyB64": fx.public_key_b64(),
    }));
    let err = verify_manifest(&load_manifest(&path).unwrap(), &VerifyOptions::default()).unwrap_err();
    assert_eq!(err.exit_code().code(), 41);
}

#[test]
fn test_verify_direct() {
    let fx = Fixture::new();
    fx.file_manifest();

    let ok = verify_direct(&fx.path("message.bin"), &fx.path("message.sig"), &fx.path("wfsl.pub")).unwrap();
    assert!(ok.ok);

    fx.write("message.bin", b"tampered");
    let bad = verify_direct(&fx.path("message.bin"), &fx.path("message.sig"), &fx.path("wfsl.pub")).unwrap();
    assert!(!bad.ok);

    let err = verify_direct(&fx.path("nope"), &fx.path("message.sig"), &fx.path("wfsl.pub")).unwrap_err();
    assert!(matches!(err, ProofgateError::NotFound { .. }));
}

proptest! {
    /// Any signature length other than 64 bytes is rejected as invalid input
    /// naming the actual length.
    #[test]
    fn prop_wrong_signature_length_rejected(len in 0usize..200) {
        prop_assume!(len != 64);
        let err = verify_detached(b"m", &vec![0u8; len], &[7u8; 32]).unwrap_err();
        prop_assert_eq!(err.exit_code().code(), 41);
        let expected = format!("got {len}");
        prop_assert!(err.to_string().contains(&expected));
    }
}
