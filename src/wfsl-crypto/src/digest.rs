//! SHA-256 digests in the `sha256:<hex>` form used by ledger entries and receipts.

use sha2::{Digest, Sha256};

/// Prefix carried by every rendered digest.
pub const SHA256_PREFIX: &str = "sha256:";

/// Lowercase hex SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// SHA-256 of `data` rendered as `sha256:<hex>`.
#[must_use]
pub fn prefixed_sha256(data: impl AsRef<[u8]>) -> String {
    format!("{SHA256_PREFIX}{}", sha256_hex(data))
}
