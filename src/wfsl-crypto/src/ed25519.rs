//! Ed25519 signature operations.
//!
//! Keys arrive either as PEM text (PKCS#8 private keys, SPKI public keys) or
//! as raw bytes decoded from base64 manifests.

use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;

use crate::error::CryptoError;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;

/// Ed25519 detached signature length in bytes.
pub const SIGNATURE_LENGTH: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// Produces detached signatures over exact byte strings.
pub trait DetachedSigner {
    /// Raw public key bytes matching this signer.
    fn public_key(&self) -> Vec<u8>;

    /// Sign data and return the signature bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Checks detached signatures against a fixed public key.
pub trait DetachedVerifier {
    /// Returns `Ok(false)` on mismatch, `Err` when the signature is malformed.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError>;
}

/// Ed25519 signer.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Create a new signer with a random key.
    #[must_use]
    pub fn random() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a signer from seed bytes (32 bytes).
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let seed_array: [u8; 32] = seed.try_into().map_err(|_| {
            CryptoError::invalid_private_key(format!(
                "Ed25519 seed must be 32 bytes, got {}",
                seed.len()
            ))
        })?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed_array),
        })
    }

    /// Parse a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_pkcs8_pem(pem.trim())
            .map_err(|e| CryptoError::invalid_private_key(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Render the private key as PKCS#8 PEM.
    pub fn to_pkcs8_pem(&self) -> Result<String, CryptoError> {
        self.signing_key
            .to_pkcs8_pem(ed25519_dalek::pkcs8::spki::der::pem::LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| CryptoError::invalid_private_key(e.to_string()))
    }

    /// Verifier for this signer's public key.
    #[must_use]
    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier {
            verifying_key: self.signing_key.verifying_key(),
        }
    }
}

impl DetachedSigner for Ed25519Signer {
    fn public_key(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| CryptoError::signing_failed(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

/// Ed25519 verifier bound to one public key.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    verifying_key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Build a verifier from raw public key bytes (32 bytes).
    pub fn from_bytes(public_key: &[u8]) -> Result<Self, CryptoError> {
        let pk_bytes: [u8; PUBLIC_KEY_LENGTH] = public_key.try_into().map_err(|_| {
            CryptoError::invalid_public_key(format!(
                "Ed25519 public key must be {PUBLIC_KEY_LENGTH} bytes, got {}",
                public_key.len()
            ))
        })?;

        let verifying_key = VerifyingKey::from_bytes(&pk_bytes)
            .map_err(|e| CryptoError::invalid_public_key(e.to_string()))?;
        Ok(Self { verifying_key })
    }

    /// Parse an SPKI PEM public key.
    pub fn from_public_key_pem(pem: &str) -> Result<Self, CryptoError> {
        let verifying_key = VerifyingKey::from_public_key_pem(pem.trim())
            .map_err(|e| CryptoError::invalid_public_key(e.to_string()))?;
        Ok(Self { verifying_key })
    }

    /// Render the public key as SPKI PEM.
    pub fn to_public_key_pem(&self) -> Result<String, CryptoError> {
        self.verifying_key
            .to_public_key_pem(ed25519_dalek::pkcs8::spki::der::pem::LineEnding::LF)
            .map_err(|e| CryptoError::invalid_public_key(e.to_string()))
    }
}

impl DetachedVerifier for Ed25519Verifier {
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let sig_bytes: [u8; SIGNATURE_LENGTH] = signature.try_into().map_err(|_| {
            CryptoError::invalid_signature(format!(
                "Ed25519 signature must be {SIGNATURE_LENGTH} bytes, got {}",
                signature.len()
            ))
        })?;

        let sig = Signature::from_bytes(&sig_bytes);

        Ok(self.verifying_key.verify(data, &sig).is_ok())
    }
}
