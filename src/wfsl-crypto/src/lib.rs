//! # wfsl-crypto
//!
//! Signing primitives shared by the WFSL licence core and ProofGate.
//!
//! Everything WFSL signs is a detached Ed25519 signature over an exact
//! byte string:
//!
//! ```text
//! token     = base64(payload_json) "." base64(Sign_Ed25519(key, payload_json))
//! receipt   = Sign_Ed25519(key, receipt_json)
//! manifest  = Sign_Ed25519(key, message_file_bytes)
//! ```
//!
//! Digests used by the issuance ledger and receipts are SHA-256, rendered as
//! `sha256:<lowercase hex>`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod digest;
mod ed25519;
mod encoding;
mod error;

pub use digest::{prefixed_sha256, sha256_hex, SHA256_PREFIX};
pub use ed25519::{
    DetachedSigner, DetachedVerifier, Ed25519Signer, Ed25519Verifier, PUBLIC_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
pub use encoding::{cleanse_base64, decode_base64, decode_base64_lenient, encode_base64};
pub use error::CryptoError;

/// Constant-time byte comparison.
///
/// Used when comparing digests recomputed from untrusted input against
/// stored values. The length check returns early; digest lengths are public.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
