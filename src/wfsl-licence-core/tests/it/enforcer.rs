//! Pro gate through the enforcer and key providers.

use wfsl_crypto::Ed25519Signer;
use wfsl_licence_core::{
    require_capability_at, Enforcer, ErrorKind, StaticKeyProvider, TokenSource,
};

use crate::{issue_token, NOW};

#[test]
fn test_gate_outcomes() {
    let signer = Ed25519Signer::random();
    let v = signer.verifier();
    let pro = issue_token(&signer, "org_1", "pro", &["x"], 3600).token;
    let community = issue_token(&signer, "org_1", "community", &["x"], 3600).token;

    assert!(require_capability_at(&pro, &v, Some("x"), NOW).is_ok());
    assert_eq!(
        require_capability_at(&pro, &v, Some("y"), NOW).unwrap_err().kind(),
        ErrorKind::FeatureDisabled
    );
    let err = require_capability_at(&community, &v, None, NOW).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PlanInsufficient);
    assert_eq!(err.detail(), Some("Plan 'community' does not permit Pro operations."));
}

#[test]
fn test_enforcer_reads_token_file() {
    let signer = Ed25519Signer::random();
    let issued = issue_token(&signer, "org_9", "pro", &["evidence-pack"], 10 * 365 * 24 * 3600);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token");
    std::fs::write(&path, format!("{}\n", issued.token)).unwrap();

    let keys = StaticKeyProvider::public_only(signer.verifier().to_public_key_pem().unwrap());
    let source = TokenSource::File(path);
    let authority = Enforcer::new(&source, &keys)
        .require_pro(Some("evidence-pack"))
        .unwrap();
    assert_eq!(authority.subject(), "org_9");
}
