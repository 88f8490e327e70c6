//! Configuration for licence issuance and enforcement.

use std::path::PathBuf;

use crate::keys::{FileKeyProvider, TokenSource};

/// Issuer written into entitlements when none is given.
pub const DEFAULT_ISSUER: &str = "wfsl";

/// Plan value that unlocks Pro capability.
pub const PRO_PLAN: &str = "pro";

/// Entitlement schema version understood by this crate.
pub const SCHEMA_VERSION: &str = "v1";

/// Issuance log location, relative to the working directory.
pub const DEFAULT_ISSUANCE_LOG: &str = ".wfsl/issuance.log.jsonl";

/// Environment variable naming the Ed25519 private key PEM.
pub const ENV_SIGNING_KEY_PATH: &str = "WFSL_SIGNING_KEY_PATH";
/// Environment variable naming the Ed25519 public key PEM.
pub const ENV_PUBLIC_KEY_PATH: &str = "WFSL_PUBLIC_KEY_PATH";
/// Environment variable carrying an inline licence token.
pub const ENV_LICENCE_TOKEN: &str = "WFSL_LICENCE_TOKEN";
/// Environment variable naming a file that holds the licence token.
pub const ENV_LICENCE_TOKEN_FILE: &str = "WFSL_LICENCE_TOKEN_FILE";

/// Configuration for licence operations.
///
/// The core never reads the environment itself; binaries build a
/// `LicenceConfig` once (usually via [`LicenceConfig::from_env`]) and thread
/// it through.
#[derive(Debug, Clone)]
pub struct LicenceConfig {
    /// Issuer used when an issuance request leaves it unset.
    pub issuer: String,
    /// Path to the private signing key PEM.
    pub signing_key_path: Option<PathBuf>,
    /// Path to the public verification key PEM.
    pub public_key_path: Option<PathBuf>,
    /// Where the licence token comes from.
    pub token_source: TokenSource,
    /// Issuance log path.
    pub issuance_log: PathBuf,
}

impl Default for LicenceConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.into(),
            signing_key_path: None,
            public_key_path: None,
            token_source: TokenSource::None,
            issuance_log: PathBuf::from(DEFAULT_ISSUANCE_LOG),
        }
    }
}

impl LicenceConfig {
    /// Build a configuration from the `WFSL_*` environment variables.
    ///
    /// An inline token takes precedence over a token file. Empty values are
    /// treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let token_source = match (var(ENV_LICENCE_TOKEN), var(ENV_LICENCE_TOKEN_FILE)) {
            (Some(token), _) => TokenSource::Inline(token.trim().to_string()),
            (None, Some(path)) => TokenSource::File(PathBuf::from(path)),
            (None, None) => TokenSource::None,
        };

        Self {
            signing_key_path: var(ENV_SIGNING_KEY_PATH).map(PathBuf::from),
            public_key_path: var(ENV_PUBLIC_KEY_PATH).map(PathBuf::from),
            token_source,
            ..Self::default()
        }
    }

    /// Key provider reading the configured PEM paths.
    #[must_use]
    pub fn key_provider(&self) -> FileKeyProvider {
        FileKeyProvider::new(self.signing_key_path.clone(), self.public_key_path.clone())
    }
}
