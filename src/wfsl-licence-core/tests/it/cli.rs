//! `wfsl-licence` binary output.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use wfsl_crypto::Ed25519Signer;
use wfsl_licence_core::verify;

fn run_issue(dir: &Path, signer: &Ed25519Signer, extra: &[&str]) -> Output {
    let key = dir.join("issuer.pem");
    std::fs::write(&key, signer.to_pkcs8_pem().unwrap()).unwrap();

    Command::new(env!("CARGO_BIN_EXE_wfsl-licence"))
        .env_clear()
        .env("WFSL_SIGNING_KEY_PATH", &key)
        .current_dir(dir)
        .args(["issue", "--sub", "org_1", "--plan", "pro", "--exp-hours", "1"])
        .args(["--features", "x,y", "--log"])
        .arg(dir.join("issuance.log.jsonl"))
        .args(extra)
        .output()
        .unwrap()
}

fn stdout_json(out: &Output) -> Value {
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn test_issue_prints_single_document_with_token() {
    let dir = tempfile::tempdir().unwrap();
    let signer = Ed25519Signer::random();

    let summary = stdout_json(&run_issue(dir.path(), &signer, &[]));
    assert_eq!(summary["sub"], "org_1");
    assert!(summary["entryHash"].as_str().unwrap().starts_with("sha256:"));
    assert!(summary.get("out").is_none());

    let token = summary["token"].as_str().unwrap();
    let authority = verify(token, &signer.verifier()).unwrap();
    assert_eq!(authority.token_id(), summary["jti"].as_str());
}

#[test]
fn test_issue_with_out_keeps_token_off_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let signer = Ed25519Signer::random();
    let out_path = dir.path().join("token.txt");

    let summary = stdout_json(&run_issue(dir.path(), &signer, &["--out", "token.txt"]));
    assert!(summary.get("token").is_none());
    assert_eq!(summary["out"], "token.txt");

    let token = std::fs::read_to_string(out_path).unwrap();
    assert!(verify(token.trim(), &signer.verifier()).is_ok());
}
