//! Consolidated integration tests for wfsl-licence-core.
//!
//! One test binary keeps proptest suites from running as separate
//! processes in parallel.
//! See: https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod cli;
mod enforcer;
mod entitlement;
mod ledger;
mod receipt;

use wfsl_crypto::Ed25519Signer;
use wfsl_licence_core::{build_at, issue, EntitlementParams, IssuedToken};

/// Fixed clock for deterministic expiry checks.
pub const NOW: i64 = 1_800_000_000;

/// Issue a token for `sub` on `plan` that expires `ttl` seconds after [`NOW`].
pub fn issue_token(
    signer: &Ed25519Signer,
    sub: &str,
    plan: &str,
    features: &[&str],
    ttl: i64,
) -> IssuedToken {
    let entitlement = build_at(
        &EntitlementParams {
            subject: sub.into(),
            plan: plan.into(),
            features: features.iter().map(|f| f.to_string()).collect(),
            expires_at: NOW + ttl,
            ..EntitlementParams::default()
        },
        NOW,
    )
    .unwrap();
    issue(&entitlement, signer).unwrap()
}
