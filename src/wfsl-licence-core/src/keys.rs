//! Key and token providers.
//!
//! The core only ever sees PEM text and token strings handed to it through
//! these types. Where that text lives (files, a secrets manager, test memory)
//! is the provider's concern.

use std::path::{Path, PathBuf};

use tracing::debug;
use wfsl_crypto::{Ed25519Signer, Ed25519Verifier};

use crate::error::{ErrorKind, LicenceError};

/// Source of Ed25519 PEM key material.
pub trait KeyProvider {
    /// PKCS#8 PEM text of the issuing private key.
    fn signing_key_pem(&self) -> Result<String, LicenceError>;

    /// SPKI PEM text of the verification public key.
    fn public_key_pem(&self) -> Result<String, LicenceError>;
}

/// Reads PEM keys from configured file paths.
#[derive(Debug, Clone, Default)]
pub struct FileKeyProvider {
    signing_key_path: Option<PathBuf>,
    public_key_path: Option<PathBuf>,
}

impl FileKeyProvider {
    /// Provider over the given paths; either may be absent.
    #[must_use]
    pub fn new(signing_key_path: Option<PathBuf>, public_key_path: Option<PathBuf>) -> Self {
        Self {
            signing_key_path,
            public_key_path,
        }
    }
}

fn read_pem(path: Option<&Path>, what: &str, hint: &str) -> Result<String, LicenceError> {
    let path = path.ok_or_else(|| {
        LicenceError::config(format!("No {what} path configured.")).with_hint(hint)
    })?;

    debug!(path = %path.display(), "Loading {what}");

    match std::fs::read_to_string(path) {
        Ok(pem) if !pem.trim().is_empty() => Ok(pem),
        Ok(_) => Err(LicenceError::config(format!("{what} file is empty.")).with_hint(hint)),
        Err(e) => Err(
            LicenceError::config(format!("Unable to load {what}: {e}")).with_hint(hint),
        ),
    }
}

impl KeyProvider for FileKeyProvider {
    fn signing_key_pem(&self) -> Result<String, LicenceError> {
        read_pem(
            self.signing_key_path.as_deref(),
            "WFSL signing key",
            "Set WFSL_SIGNING_KEY_PATH to a valid Ed25519 private key PEM.",
        )
    }

    fn public_key_pem(&self) -> Result<String, LicenceError> {
        read_pem(
            self.public_key_path.as_deref(),
            "WFSL public key",
            "Set WFSL_PUBLIC_KEY_PATH to a valid Ed25519 public key PEM.",
        )
    }
}

/// Holds PEM text in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyProvider {
    signing_pem: Option<String>,
    public_pem: Option<String>,
}

impl StaticKeyProvider {
    /// Provider over the given PEM strings.
    #[must_use]
    pub fn new(signing_pem: Option<String>, public_pem: Option<String>) -> Self {
        Self {
            signing_pem,
            public_pem,
        }
    }

    /// Public-key-only provider, as used on the verifying side.
    #[must_use]
    pub fn public_only(public_pem: impl Into<String>) -> Self {
        Self::new(None, Some(public_pem.into()))
    }
}

impl KeyProvider for StaticKeyProvider {
    fn signing_key_pem(&self) -> Result<String, LicenceError> {
        self.signing_pem
            .clone()
            .filter(|pem| !pem.trim().is_empty())
            .ok_or_else(|| LicenceError::config("Signing key is not available."))
    }

    fn public_key_pem(&self) -> Result<String, LicenceError> {
        self.public_pem
            .clone()
            .filter(|pem| !pem.trim().is_empty())
            .ok_or_else(|| LicenceError::config("Public verification key is not available."))
    }
}

/// Load and parse the issuing key.
///
/// A missing key is a configuration problem; a key that is present but will
/// not parse is an internal error, matching the failure of a signing attempt.
pub fn load_signer(provider: &dyn KeyProvider) -> Result<Ed25519Signer, LicenceError> {
    let pem = provider.signing_key_pem()?;
    parse_signer(&pem)
}

/// Parse PKCS#8 PEM into a signer.
pub fn parse_signer(pem: &str) -> Result<Ed25519Signer, LicenceError> {
    Ed25519Signer::from_pkcs8_pem(pem).map_err(|e| {
        LicenceError::internal(format!("Failed to load signing key: {e}"))
            .with_hint("Confirm the private key is a valid Ed25519 key PEM.")
    })
}

/// Load and parse the verification key.
pub fn load_verifier(provider: &dyn KeyProvider) -> Result<Ed25519Verifier, LicenceError> {
    let pem = provider.public_key_pem()?;
    parse_verifier(&pem)
}

/// Parse SPKI PEM into a verifier.
pub fn parse_verifier(pem: &str) -> Result<Ed25519Verifier, LicenceError> {
    Ed25519Verifier::from_public_key_pem(pem).map_err(|e| {
        LicenceError::config(format!("Public verification key is malformed: {e}"))
            .with_hint("Confirm WFSL_PUBLIC_KEY_PATH points to an Ed25519 public key PEM.")
    })
}

/// Where a licence token is read from.
#[derive(Debug, Clone, Default)]
pub enum TokenSource {
    /// No token configured.
    #[default]
    None,
    /// Token text held directly.
    Inline(String),
    /// Token stored in a file.
    File(PathBuf),
}

impl TokenSource {
    /// Read the token, trimmed.
    ///
    /// No source or a blank inline value is `LicenceMissing`; an unreadable or
    /// empty token file is `IoError`.
    pub fn load(&self) -> Result<String, LicenceError> {
        match self {
            Self::None => Err(LicenceError::new(ErrorKind::LicenceMissing)
                .with_hint("Set WFSL_LICENCE_TOKEN or WFSL_LICENCE_TOKEN_FILE.")),
            Self::Inline(token) => {
                let token = token.trim();
                if token.is_empty() {
                    return Err(LicenceError::missing("Inline licence token is empty."));
                }
                Ok(token.to_string())
            },
            Self::File(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    LicenceError::io(format!(
                        "Unable to read licence token file {}: {e}",
                        path.display()
                    ))
                })?;
                let token = raw.trim();
                if token.is_empty() {
                    return Err(LicenceError::io("Licence token file is empty."));
                }
                Ok(token.to_string())
            },
        }
    }
}
