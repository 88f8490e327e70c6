//! Detached Ed25519 verification of a manifest's message.
//!
//! ## Input resolution
//!
//! - Public key: override path (relative to CWD), then `publicKeyFile`
//!   (relative to the manifest), then `publicKeyB64`.
//! - Signature: `signatureFile`, then `signatureB64`.
//! - Message: `messageFile`, required.
//!
//! Base64 read from files is cleansed of everything outside the base64
//! alphabet; inline values are trimmed. Lengths are checked before any
//! cryptographic work.
//!
//! An [`ExternalVerifier`] may be consulted first. Its answer is used only if
//! it is structurally valid; otherwise the built-in Ed25519 path decides.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use wfsl_crypto::{
    cleanse_base64, decode_base64_lenient, DetachedVerifier, Ed25519Verifier, PUBLIC_KEY_LENGTH,
    SIGNATURE_LENGTH,
};

use crate::error::ProofgateError;
use crate::manifest::{absolutize, LoadedManifest};

/// Outcome reported by a verifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyResult {
    /// Whether the signature verified.
    pub ok: bool,
    /// Short reason, e.g. `"verified"`.
    pub reason: String,
    /// Verifier-specific details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl VerifyResult {
    fn builtin_verified() -> Self {
        let mut details = Map::new();
        details.insert("verifier".into(), Value::from("builtin"));
        Self {
            ok: true,
            reason: "verified".into(),
            details: Some(details),
        }
    }

    fn builtin_rejected() -> Self {
        Self {
            ok: false,
            reason: "signature verification failed".into(),
            details: None,
        }
    }

    /// Validate raw JSON from an external verifier.
    ///
    /// Accepted only with a boolean `ok`, a string `reason` and, if present,
    /// an object `details`.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "result is not a JSON object".to_string())?;
        let ok = obj
            .get("ok")
            .and_then(Value::as_bool)
            .ok_or_else(|| "result has no boolean 'ok'".to_string())?;
        let reason = obj
            .get("reason")
            .and_then(Value::as_str)
            .ok_or_else(|| "result has no string 'reason'".to_string())?;
        let details = match obj.get("details") {
            None => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => return Err("result 'details' is not an object".to_string()),
        };

        Ok(Self {
            ok,
            reason: reason.to_string(),
            details,
        })
    }
}

/// Pluggable verifier consulted before the built-in path.
pub trait ExternalVerifier {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Verify the manifest at `manifest_path`, returning the raw JSON result.
    fn verify(&self, manifest_path: &Path) -> Result<Value, ProofgateError>;
}

/// Runs an external program as `<program> [args..] <manifest>` and reads a
/// JSON result from its stdout.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandVerifier {
    /// Verifier running `program` with no extra arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the manifest path.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl ExternalVerifier for CommandVerifier {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("external")
    }

    fn verify(&self, manifest_path: &Path) -> Result<Value, ProofgateError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(manifest_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                ProofgateError::ExternalVerifier(format!(
                    "failed to execute {}: {e}",
                    self.program.display()
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProofgateError::ExternalVerifier(format!(
                "no output (status {:?}): {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        serde_json::from_str(stdout).map_err(|e| {
            ProofgateError::ExternalVerifier(format!("output is not valid JSON: {e}"))
        })
    }
}

/// Which path produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierKind {
    /// The external verifier.
    External,
    /// Built-in Ed25519.
    Builtin,
}

/// Verification outcome with provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    /// Authoritative result.
    pub result: VerifyResult,
    /// Path that produced `result`.
    pub verifier: VerifierKind,
    /// Why the external verifier was passed over, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_failure: Option<String>,
}

impl VerifyReport {
    /// Turn a negative result into [`ProofgateError::VerifyFailed`].
    pub fn into_verified(self) -> Result<Self, ProofgateError> {
        if self.result.ok {
            Ok(self)
        } else {
            Err(ProofgateError::VerifyFailed {
                reason: self.result.reason,
            })
        }
    }
}

/// Verification options.
#[derive(Default)]
pub struct VerifyOptions<'a> {
    /// Public key file overriding the manifest, relative to CWD.
    pub public_key_override: Option<PathBuf>,
    /// Verifier consulted before the built-in path.
    pub external: Option<&'a dyn ExternalVerifier>,
}

/// Verify the message named by `loaded`.
///
/// A negative signature check is `Ok` with `result.ok == false`; missing or
/// malformed inputs are errors.
#[instrument(skip_all, fields(manifest = %loaded.path.display()))]
pub fn verify_manifest(
    loaded: &LoadedManifest,
    options: &VerifyOptions<'_>,
) -> Result<VerifyReport, ProofgateError> {
    let mut external_failure = None;

    if let Some(external) = options.external {
        let answer = external
            .verify(&loaded.path)
            .map_err(|e| e.to_string())
            .and_then(|raw| VerifyResult::from_json(&raw));

        match answer {
            Ok(result) => {
                info!(verifier = external.name(), ok = result.ok, "External verifier answered");
                return Ok(VerifyReport {
                    result,
                    verifier: VerifierKind::External,
                    external_failure: None,
                });
            },
            Err(reason) => {
                warn!(
                    verifier = external.name(),
                    %reason,
                    "External verifier failed, using built-in verification"
                );
                external_failure = Some(reason);
            },
        }
    }

    let inputs = resolve_inputs(loaded, options.public_key_override.as_deref())?;
    let result = verify_detached(&inputs.message, &inputs.signature, &inputs.public_key)?;

    Ok(VerifyReport {
        result,
        verifier: VerifierKind::Builtin,
        external_failure,
    })
}

/// Decoded inputs for one verification.
#[derive(Debug, Clone)]
pub struct VerifyInputs {
    /// Message bytes.
    pub message: Vec<u8>,
    /// Decoded signature.
    pub signature: Vec<u8>,
    /// Decoded public key.
    pub public_key: Vec<u8>,
}

/// Resolve message, signature and key following the manifest precedence.
pub fn resolve_inputs(
    loaded: &LoadedManifest,
    public_key_override: Option<&Path>,
) -> Result<VerifyInputs, ProofgateError> {
    let manifest = &loaded.manifest;

    let message_file = manifest
        .message_file
        .as_deref()
        .ok_or_else(|| ProofgateError::MissingInput("messageFile".into()))?;
    let message = read_file(&loaded.resolve(message_file), "messageFile")?;

    let signature = match (&manifest.signature_file, &manifest.signature_b64) {
        (Some(file), _) => decode_file_base64(&loaded.resolve(file), "signatureFile")?,
        (None, Some(inline)) => decode_inline_base64(inline, "signatureB64")?,
        (None, None) => {
            return Err(ProofgateError::MissingInput(
                "signatureFile or signatureB64".into(),
            ))
        },
    };

    let public_key = match (public_key_override, &manifest.public_key_file, &manifest.public_key_b64) {
        (Some(path), _, _) => decode_file_base64(&absolutize(path)?, "publicKey")?,
        (None, Some(file), _) => decode_file_base64(&loaded.resolve(file), "publicKeyFile")?,
        (None, None, Some(inline)) => decode_inline_base64(inline, "publicKeyB64")?,
        (None, None, None) => {
            return Err(ProofgateError::MissingInput(
                "publicKeyFile or publicKeyB64".into(),
            ))
        },
    };

    debug!(
        message_len = message.len(),
        signature_len = signature.len(),
        public_key_len = public_key.len(),
        "Resolved verification inputs"
    );

    Ok(VerifyInputs {
        message,
        signature,
        public_key,
    })
}

/// Verify without a manifest: message file, base64 signature file and base64
/// public key file.
pub fn verify_direct(
    message: &Path,
    signature: &Path,
    public_key: &Path,
) -> Result<VerifyResult, ProofgateError> {
    let message = read_file(&absolutize(message)?, "message")?;
    let signature = decode_file_base64(&absolutize(signature)?, "signature")?;
    let public_key = decode_file_base64(&absolutize(public_key)?, "publicKey")?;
    verify_detached(&message, &signature, &public_key)
}

/// Built-in Ed25519 check with length validation.
pub fn verify_detached(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<VerifyResult, ProofgateError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(ProofgateError::InvalidInput(format!(
            "signature must be {SIGNATURE_LENGTH} bytes, got {}",
            signature.len()
        )));
    }
    if public_key.len() != PUBLIC_KEY_LENGTH {
        return Err(ProofgateError::InvalidInput(format!(
            "public key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
            public_key.len()
        )));
    }

    let verifier = Ed25519Verifier::from_bytes(public_key)
        .map_err(|e| ProofgateError::InvalidInput(format!("public key is invalid: {e}")))?;

    match verifier.verify(message, signature) {
        Ok(true) => Ok(VerifyResult::builtin_verified()),
        Ok(false) => {
            debug!("Ed25519 signature mismatch");
            Ok(VerifyResult::builtin_rejected())
        },
        Err(e) => Err(ProofgateError::InvalidInput(format!("signature is invalid: {e}"))),
    }
}

fn read_file(path: &Path, label: &str) -> Result<Vec<u8>, ProofgateError> {
    std::fs::read(path).map_err(|_| ProofgateError::not_found(label, path))
}

fn decode_file_base64(path: &Path, label: &str) -> Result<Vec<u8>, ProofgateError> {
    let raw = read_file(path, label)?;
    decode(&cleanse_base64(&raw), label)
}

fn decode_inline_base64(value: &str, label: &str) -> Result<Vec<u8>, ProofgateError> {
    decode(value.trim(), label)
}

fn decode(b64: &str, label: &str) -> Result<Vec<u8>, ProofgateError> {
    if b64.is_empty() {
        return Err(ProofgateError::InvalidInput(format!("{label} is empty")));
    }
    decode_base64_lenient(b64)
        .map_err(|_| ProofgateError::InvalidInput(format!("{label} is not valid base64")))
}
