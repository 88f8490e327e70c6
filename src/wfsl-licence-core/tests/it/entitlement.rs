//! Token codec behaviour across issue and verify.

use proptest::prelude::*;
use wfsl_crypto::{decode_base64, encode_base64, Ed25519Signer};
use wfsl_licence_core::{verify_at, ErrorKind};

use crate::{issue_token, NOW};

#[test]
fn test_roundtrip_preserves_claims() {
    let signer = Ed25519Signer::random();
    let issued = issue_token(&signer, "org_42", "pro", &["evidence-pack", "audit"], 3600);

    let authority = verify_at(&issued.token, &signer.verifier(), NOW).unwrap();
    assert_eq!(authority.subject(), "org_42");
    assert_eq!(authority.plan(), "pro");
    assert_eq!(authority.features(), ["evidence-pack", "audit"]);
    assert_eq!(authority.expires_at(), NOW + 3600);
    assert_eq!(authority.token_id(), Some(issued.payload.token_id()));
    assert!(authority.policy().is_none());
}

#[test]
fn test_expiry_boundary() {
    let signer = Ed25519Signer::random();
    let issued = issue_token(&signer, "org_1", "pro", &[], 60);
    let v = signer.verifier();

    assert!(verify_at(&issued.token, &v, NOW + 59).is_ok());
    assert_eq!(
        verify_at(&issued.token, &v, NOW + 60).unwrap_err().kind(),
        ErrorKind::LicenceExpired
    );
    assert_eq!(
        verify_at(&issued.token, &v, NOW + 61).unwrap_err().kind(),
        ErrorKind::LicenceExpired
    );
}

#[test]
fn test_signature_segment_matches_token() {
    let signer = Ed25519Signer::random();
    let issued = issue_token(&signer, "org_1", "community", &[], 60);
    assert!(issued.token.ends_with(&format!(".{}", issued.signature)));
}

#[test]
fn test_foreign_signer_rejected() {
    let issuer = Ed25519Signer::random();
    let forger = Ed25519Signer::random();
    let forged = issue_token(&forger, "org_1", "pro", &[], 60);

    let err = verify_at(&forged.token, &issuer.verifier(), NOW).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LicenceInvalid);
    assert_eq!(err.exit_code(), 11);
}

#[test]
fn test_unsigned_version_edit_is_invalid_not_mismatch() {
    let signer = Ed25519Signer::random();
    let issued = issue_token(&signer, "org_1", "pro", &[], 60);

    let (payload, signature) = issued.token.split_once('.').unwrap();
    let json = String::from_utf8(decode_base64(payload).unwrap()).unwrap();
    assert!(json.contains(r#""version":"v1""#));
    let edited = json.replace(r#""version":"v1""#, r#""version":"v2""#);
    let tampered = format!("{}.{signature}", encode_base64(edited));

    let err = verify_at(&tampered, &signer.verifier(), NOW).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LicenceInvalid);
}

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=.";

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// Any single-character change to a token is rejected as invalid.
    #[test]
    fn prop_tampered_token_rejected(pos in any::<prop::sample::Index>(), sym in 0..ALPHABET.len()) {
        let signer = Ed25519Signer::random();
        let issued = issue_token(&signer, "org_1", "pro", &["x"], 3600);

        let mut bytes = issued.token.clone().into_bytes();
        let i = pos.index(bytes.len());
        prop_assume!(bytes[i] != ALPHABET[sym]);
        bytes[i] = ALPHABET[sym];
        let tampered = String::from_utf8(bytes).unwrap();

        let err = verify_at(&tampered, &signer.verifier(), NOW).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::LicenceInvalid);
    }
}
