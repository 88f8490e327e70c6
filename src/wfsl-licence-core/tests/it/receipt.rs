//! Receipts issued under a verified authority.

use wfsl_crypto::Ed25519Signer;
use wfsl_licence_core::{
    issue_receipt, output_hash, require_capability_at, verify_receipt, ErrorKind, ReceiptRequest,
    SignedReceipt,
};

use crate::{issue_token, NOW};

#[test]
fn test_receipt_scenario() {
    let issuer = Ed25519Signer::random();
    let token = issue_token(&issuer, "org_1", "pro", &["evidence-pack"], 3600).token;
    let authority =
        require_capability_at(&token, &issuer.verifier(), Some("evidence-pack"), NOW).unwrap();

    let request = ReceiptRequest {
        tool: "evidence-pack".into(),
        tool_version: "2.0.1".into(),
        output_hash: output_hash(b"{\"findings\":[]}"),
    };
    let signed = issue_receipt(&authority, &request, &issuer).unwrap();
    assert_eq!(signed.receipt.plan, "pro");
    assert!(signed.receipt.output_hash.starts_with("sha256:"));

    let stored = serde_json::to_string(&signed).unwrap();
    let loaded: SignedReceipt = serde_json::from_str(&stored).unwrap();
    assert!(loaded.verify(&issuer.verifier()).is_ok());

    let mut edited = loaded.receipt.clone();
    edited.licence_subject = "org_2".into();
    let err = verify_receipt(&edited, &loaded.signature, &issuer.verifier()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TamperDetected);
    assert_eq!(err.exit_code(), 18);
}
