//! Entitlement tokens.
//!
//! Wire format: `base64(payload_json).base64(ed25519_signature)`, where the
//! signature covers the exact payload bytes. Verification never re-serializes
//! the payload, so key order in the JSON is irrelevant.
//!
//! ## Verification order
//!
//! 1. exactly two `.`-separated segments
//! 2. both segments decode as base64
//! 3. payload parses as JSON
//! 4. signature verifies over the decoded payload bytes
//! 5. `version == "v1"` (signed but foreign payloads are a policy mismatch)
//! 6. `exp > now`
//! 7. `sub` and `plan` present
//!
//! Malformed input and signature failure share `LicenceInvalid`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use wfsl_crypto::{decode_base64, encode_base64, DetachedSigner, DetachedVerifier};

use crate::config::{DEFAULT_ISSUER, SCHEMA_VERSION};
use crate::error::{ErrorKind, LicenceError};

/// Current time in epoch seconds.
#[must_use]
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A signed claim: who may use which plan and features until when.
///
/// Only [`build`] and [`build_at`] construct one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entitlement {
    #[serde(rename = "iss")]
    issuer: String,
    #[serde(rename = "sub")]
    subject: String,
    plan: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy: Option<String>,
    #[serde(rename = "exp")]
    expires_at: i64,
    #[serde(rename = "jti")]
    token_id: String,
    #[serde(rename = "version")]
    schema_version: String,
}

impl Entitlement {
    /// Issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Subject the entitlement was issued to.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Plan name.
    #[must_use]
    pub fn plan(&self) -> &str {
        &self.plan
    }

    /// Enabled features, in issuance order.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Policy name.
    #[must_use]
    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    /// Expiry, epoch seconds.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Unique token id.
    #[must_use]
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Schema version.
    #[must_use]
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// The JSON bytes that get signed.
    pub fn to_json(&self) -> Result<String, LicenceError> {
        serde_json::to_string(self)
            .map_err(|e| LicenceError::internal(format!("Failed to serialize entitlement: {e}")))
    }
}

/// Parameters for [`build`].
#[derive(Debug, Clone, Default)]
pub struct EntitlementParams {
    /// Subject (required).
    pub subject: String,
    /// Plan (required), e.g. `community` or `pro`.
    pub plan: String,
    /// Features; blank entries are dropped.
    pub features: Vec<String>,
    /// Optional policy name.
    pub policy: Option<String>,
    /// Expiry, epoch seconds.
    pub expires_at: i64,
    /// Issuer; defaults to `wfsl`.
    pub issuer: Option<String>,
}

/// Build an entitlement against the current clock.
pub fn build(params: &EntitlementParams) -> Result<Entitlement, LicenceError> {
    build_at(params, unix_now())
}

/// Build an entitlement, treating `now` as the current epoch second.
pub fn build_at(params: &EntitlementParams, now: i64) -> Result<Entitlement, LicenceError> {
    let issuer = params.issuer.as_deref().unwrap_or(DEFAULT_ISSUER).trim();
    let subject = params.subject.trim();

    if issuer.is_empty() {
        return Err(LicenceError::config("Issuer (iss) is required."));
    }
    if subject.is_empty() {
        return Err(LicenceError::config("Subject (sub) is required."));
    }
    if params.plan.is_empty() {
        return Err(LicenceError::config("Plan is required."));
    }
    if params.expires_at <= 0 {
        return Err(LicenceError::config("exp must be a valid epoch seconds number."));
    }
    if params.expires_at <= now {
        return Err(LicenceError::config("exp must be in the future."));
    }

    let features = params
        .features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    let policy = params
        .policy
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    Ok(Entitlement {
        issuer: issuer.to_string(),
        subject: subject.to_string(),
        plan: params.plan.clone(),
        features,
        policy,
        expires_at: params.expires_at,
        token_id: Uuid::new_v4().to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
    })
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Wire form.
    pub token: String,
    /// The entitlement that was signed.
    pub payload: Entitlement,
    /// Base64 signature segment.
    pub signature: String,
}

/// Sign an entitlement.
///
/// Either a complete token is returned or nothing is produced.
#[instrument(skip_all, fields(jti = %entitlement.token_id))]
pub fn issue(
    entitlement: &Entitlement,
    signer: &dyn DetachedSigner,
) -> Result<IssuedToken, LicenceError> {
    let payload_json = entitlement.to_json()?;

    let signature = signer.sign(payload_json.as_bytes()).map_err(|e| {
        LicenceError::internal(format!("Failed to sign token: {e}"))
            .with_hint("Confirm the private key is a valid Ed25519 key PEM.")
    })?;

    let signature = encode_base64(signature);
    let token = format!("{}.{}", encode_base64(payload_json.as_bytes()), signature);

    info!(sub = %entitlement.subject, plan = %entitlement.plan, "Issued entitlement token");

    Ok(IssuedToken {
        token,
        payload: entitlement.clone(),
        signature,
    })
}

/// Trusted result of a successful verification.
///
/// Only [`verify`] and [`verify_at`] construct this. It carries no proof of
/// its own and must not be persisted or shipped across processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedAuthority {
    subject: String,
    plan: String,
    features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy: Option<String>,
    expires_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_id: Option<String>,
}

impl VerifiedAuthority {
    /// Verified subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Verified plan.
    #[must_use]
    pub fn plan(&self) -> &str {
        &self.plan
    }

    /// Verified features.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Whether `feature` is enabled.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Verified policy.
    #[must_use]
    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    /// Expiry, epoch seconds.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Token id, when the token carried one.
    #[must_use]
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }
}

/// Payload shape accepted on the verifying side. Lenient on purpose so that
/// missing fields surface as the right error kind after the signature check
/// rather than as a parse failure.
#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(default)]
    sub: String,
    #[serde(default)]
    plan: String,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    policy: Option<String>,
    exp: i64,
    #[serde(default)]
    jti: Option<String>,
    #[serde(default)]
    version: String,
}

/// Verify a token against the current clock.
pub fn verify(
    token: &str,
    verifier: &dyn DetachedVerifier,
) -> Result<VerifiedAuthority, LicenceError> {
    verify_at(token, verifier, unix_now())
}

/// Verify a token, treating `now` as the current epoch second.
#[instrument(skip_all)]
pub fn verify_at(
    token: &str,
    verifier: &dyn DetachedVerifier,
    now: i64,
) -> Result<VerifiedAuthority, LicenceError> {
    if token.is_empty() {
        return Err(LicenceError::new(ErrorKind::LicenceMissing));
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        debug!(segments = parts.len(), "Token has wrong segment count");
        return Err(LicenceError::invalid("Token must be payload.signature"));
    }

    let (payload_bytes, signature) = match (decode_base64(parts[0]), decode_base64(parts[1])) {
        (Ok(p), Ok(s)) => (p, s),
        _ => return Err(LicenceError::invalid("Token is not valid base64.")),
    };

    let payload: WirePayload = serde_json::from_slice(&payload_bytes)
        .map_err(|_| LicenceError::invalid("Payload is not valid JSON."))?;

    match verifier.verify(&payload_bytes, &signature) {
        Ok(true) => {},
        Ok(false) | Err(_) => {
            warn!("Entitlement signature verification failed");
            return Err(LicenceError::invalid("Signature verification failed."));
        },
    }

    if payload.version != SCHEMA_VERSION {
        return Err(LicenceError::new(ErrorKind::PolicyMismatch)
            .with_detail(format!("Unsupported entitlement version '{}'.", payload.version)));
    }

    if payload.exp <= now {
        debug!(exp = payload.exp, now, "Entitlement expired");
        return Err(LicenceError::new(ErrorKind::LicenceExpired));
    }

    if payload.sub.is_empty() || payload.plan.is_empty() {
        return Err(LicenceError::invalid("Required entitlement fields missing."));
    }

    Ok(VerifiedAuthority {
        subject: payload.sub,
        plan: payload.plan,
        features: payload.features,
        policy: payload.policy,
        expires_at: payload.exp,
        token_id: payload.jti,
    })
}
