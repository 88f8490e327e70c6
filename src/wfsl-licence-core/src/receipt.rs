//! Execution receipts.
//!
//! A receipt binds the hash of a tool's output to the authority that was
//! verified for the run. It is signed on its own, independent of the licence
//! token, and verification failure is reported as tampering with the artifact
//! rather than as an authentication problem.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use wfsl_crypto::{
    decode_base64_lenient, encode_base64, prefixed_sha256, DetachedSigner, DetachedVerifier,
};

use crate::entitlement::VerifiedAuthority;
use crate::error::LicenceError;

/// Attestation of one Pro execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Tool name.
    pub tool: String,
    /// Tool version.
    pub tool_version: String,
    /// Subject of the licence the run was authorized under.
    pub licence_subject: String,
    /// Plan of that licence.
    pub plan: String,
    /// Policy of that licence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Digest of the tool output.
    pub output_hash: String,
    /// Issuance time, RFC 3339 UTC.
    pub issued_at: String,
}

impl Receipt {
    fn signing_bytes(&self) -> Result<Vec<u8>, LicenceError> {
        serde_json::to_vec(self)
            .map_err(|e| LicenceError::internal(format!("Failed to serialize receipt: {e}")))
    }
}

/// Receipt plus its base64 signature, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedReceipt {
    /// The receipt.
    pub receipt: Receipt,
    /// Base64 Ed25519 signature over the receipt JSON.
    pub signature: String,
}

/// What was executed.
#[derive(Debug, Clone)]
pub struct ReceiptRequest {
    /// Tool name.
    pub tool: String,
    /// Tool version.
    pub tool_version: String,
    /// Digest of the tool output, normally from [`output_hash`].
    pub output_hash: String,
}

/// `sha256:<hex>` digest of tool output.
#[must_use]
pub fn output_hash(output: impl AsRef<[u8]>) -> String {
    prefixed_sha256(output)
}

/// Sign a receipt for a run authorized by `authority`.
///
/// The authority is taken as already verified in the same operation.
#[instrument(skip_all, fields(tool = %request.tool))]
pub fn issue_receipt(
    authority: &VerifiedAuthority,
    request: &ReceiptRequest,
    signer: &dyn DetachedSigner,
) -> Result<SignedReceipt, LicenceError> {
    let receipt = Receipt {
        tool: request.tool.clone(),
        tool_version: request.tool_version.clone(),
        licence_subject: authority.subject().to_string(),
        plan: authority.plan().to_string(),
        policy: authority.policy().map(str::to_string),
        output_hash: request.output_hash.clone(),
        issued_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let signature = signer
        .sign(&receipt.signing_bytes()?)
        .map_err(|e| LicenceError::internal(format!("Failed to sign receipt: {e}")))?;

    Ok(SignedReceipt {
        receipt,
        signature: encode_base64(signature),
    })
}

/// Check a receipt signature and hand the receipt back on success.
pub fn verify_receipt(
    receipt: &Receipt,
    signature: &str,
    verifier: &dyn DetachedVerifier,
) -> Result<Receipt, LicenceError> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(LicenceError::config("Receipt and signature are required."));
    }

    let sig = decode_base64_lenient(signature)
        .map_err(|_| LicenceError::tamper("Receipt signature is not valid base64."))?;

    match verifier.verify(&receipt.signing_bytes()?, &sig) {
        Ok(true) => Ok(receipt.clone()),
        Ok(false) | Err(_) => {
            warn!(tool = %receipt.tool, "Receipt signature verification failed");
            Err(LicenceError::tamper("Receipt signature verification failed."))
        },
    }
}

impl SignedReceipt {
    /// [`verify_receipt`] on the embedded receipt and signature.
    pub fn verify(&self, verifier: &dyn DetachedVerifier) -> Result<Receipt, LicenceError> {
        verify_receipt(&self.receipt, &self.signature, verifier)
    }
}
