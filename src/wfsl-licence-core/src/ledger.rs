//! Issuance ledger.
//!
//! Every issued token is recorded as one JSON line in an append-only file.
//! Entries are hash-chained:
//!
//! ```text
//! entryHash = sha256(prev | payloadHash | tokenHash | ts | jti)
//! ```
//!
//! where `prev` is the previous entry's `entryHash` (empty for the first
//! entry). The ledger is not secret, but edits to it are detectable.
//!
//! Single writer per log path. There is no file locking.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use wfsl_crypto::{constant_time_eq, prefixed_sha256};

use crate::entitlement::Entitlement;
use crate::error::LicenceError;

/// One line of the issuance log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceLogEntry {
    /// Issuance time, RFC 3339 UTC with milliseconds.
    #[serde(rename = "ts")]
    pub timestamp: String,
    /// Token id.
    #[serde(rename = "jti")]
    pub token_id: String,
    /// Subject.
    #[serde(rename = "sub")]
    pub subject: String,
    /// Plan.
    pub plan: String,
    /// Expiry, epoch seconds.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Number of features granted.
    #[serde(rename = "featuresCount")]
    pub features_count: usize,
    /// Policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Digest of the signed entitlement JSON.
    #[serde(rename = "payloadHash")]
    pub payload_hash: String,
    /// Digest of the full token string.
    #[serde(rename = "tokenHash")]
    pub token_hash: String,
    /// Previous entry hash; absent on the first entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// Hash of this entry.
    #[serde(rename = "entryHash")]
    pub entry_hash: String,
}

impl IssuanceLogEntry {
    /// Recompute this entry's hash from its fields.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        compute_entry_hash(
            self.prev.as_deref(),
            &self.payload_hash,
            &self.token_hash,
            &self.timestamp,
            &self.token_id,
        )
    }

    /// Whether the stored hash matches the fields.
    #[must_use]
    pub fn verify_hash(&self) -> bool {
        constant_time_eq(self.compute_hash().as_bytes(), self.entry_hash.as_bytes())
    }
}

/// `sha256(prev | payloadHash | tokenHash | ts | jti)`.
#[must_use]
pub fn compute_entry_hash(
    prev: Option<&str>,
    payload_hash: &str,
    token_hash: &str,
    timestamp: &str,
    token_id: &str,
) -> String {
    let material = format!(
        "{}|{}|{}|{}|{}",
        prev.unwrap_or_default(),
        payload_hash,
        token_hash,
        timestamp,
        token_id
    );
    prefixed_sha256(material)
}

/// Result of walking the whole chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    /// Whether the chain is intact.
    pub valid: bool,
    /// Number of non-blank lines.
    pub total_entries: usize,
    /// Whether the first entry has no `prev`.
    pub genesis_valid: bool,
    /// Whether all links and entry hashes check out.
    pub hash_chain_valid: bool,
    /// Zero-based index of the first bad entry.
    pub first_broken_index: Option<usize>,
    /// `entryHash` of the last entry.
    pub head_hash: Option<String>,
    /// Problems found, in file order.
    pub errors: Vec<String>,
}

/// Append-only, hash-chained issuance log at a fixed path.
#[derive(Debug, Clone)]
pub struct IssuanceLedger {
    path: PathBuf,
}

impl IssuanceLedger {
    /// Ledger at `path`. Nothing is touched until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an issued token.
    ///
    /// Fails with `TamperDetected` and writes nothing if the current last
    /// line is not a valid entry.
    #[instrument(skip_all, fields(path = %self.path.display(), jti = %entitlement.token_id()))]
    pub fn append(
        &self,
        entitlement: &Entitlement,
        token: &str,
    ) -> Result<IssuanceLogEntry, LicenceError> {
        let raw = self.read_raw()?.unwrap_or_default();
        let prev = last_entry_hash(&raw)?;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let payload_hash = prefixed_sha256(entitlement.to_json()?);
        let token_hash = prefixed_sha256(token);
        let entry_hash = compute_entry_hash(
            prev.as_deref(),
            &payload_hash,
            &token_hash,
            &timestamp,
            entitlement.token_id(),
        );

        let entry = IssuanceLogEntry {
            timestamp,
            token_id: entitlement.token_id().to_string(),
            subject: entitlement.subject().to_string(),
            plan: entitlement.plan().to_string(),
            expires_at: entitlement.expires_at(),
            features_count: entitlement.features().len(),
            policy: entitlement.policy().map(str::to_string),
            payload_hash,
            token_hash,
            prev,
            entry_hash,
        };

        let mut line = String::new();
        if !raw.is_empty() && !raw.ends_with('\n') {
            // Terminate a hand-trimmed last line before appending to it.
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(&entry).map_err(|e| {
            LicenceError::internal(format!("Failed to serialize log entry: {e}"))
        })?);
        line.push('\n');

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                LicenceError::io(format!("Unable to create {}: {e}", dir.display()))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LicenceError::io(format!("Unable to open issuance log: {e}")))?;
        file.write_all(line.as_bytes())
            .map_err(|e| LicenceError::io(format!("Unable to append issuance log: {e}")))?;

        info!(entry_hash = %entry.entry_hash, "Appended issuance log entry");
        Ok(entry)
    }

    fn read_raw(&self) -> Result<Option<String>, LicenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| LicenceError::io(format!("Unable to read issuance log: {e}")))
    }

    /// Parse every entry. Any unparseable line is `TamperDetected`.
    pub fn read_entries(&self) -> Result<Vec<IssuanceLogEntry>, LicenceError> {
        let Some(raw) = self.read_raw()? else {
            return Ok(Vec::new());
        };

        raw.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|_| {
                    LicenceError::tamper(format!("Issuance log entry {i} is not valid JSON."))
                })
            })
            .collect()
    }

    /// Walk the chain from genesis and report every break.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn verify_chain(&self) -> Result<ChainVerification, LicenceError> {
        let raw = self.read_raw()?.unwrap_or_default();

        let mut errors = Vec::new();
        let mut first_broken: Option<usize> = None;
        let mut genesis_valid = true;
        let mut hash_chain_valid = true;
        let mut previous: Option<String> = None;
        let mut total_entries = 0;

        for (i, line) in raw.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
            total_entries += 1;

            let entry: IssuanceLogEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(format!("Entry {i} is not valid JSON: {e}"));
                    hash_chain_valid = false;
                    first_broken.get_or_insert(i);
                    // Later links cannot be checked without this entry's hash.
                    previous = None;
                    continue;
                },
            };

            if i == 0 && entry.prev.is_some() {
                errors.push("Invalid genesis: first entry has a prev hash".to_string());
                genesis_valid = false;
                first_broken.get_or_insert(i);
            }

            if i > 0 && previous.is_some() && entry.prev != previous {
                errors.push(format!(
                    "Hash chain break at entry {i}: expected prev={:?}, got {:?}",
                    previous, entry.prev
                ));
                hash_chain_valid = false;
                first_broken.get_or_insert(i);
            }

            if !entry.verify_hash() {
                errors.push(format!(
                    "Hash mismatch at entry {i}: computed='{}', stored='{}'",
                    entry.compute_hash(),
                    entry.entry_hash
                ));
                hash_chain_valid = false;
                first_broken.get_or_insert(i);
            }

            previous = Some(entry.entry_hash);
        }

        let valid = errors.is_empty();
        if valid {
            debug!(entries = total_entries, "Issuance chain intact");
        } else {
            warn!(entries = total_entries, errors = errors.len(), "Issuance chain BROKEN");
        }

        Ok(ChainVerification {
            valid,
            total_entries,
            genesis_valid,
            hash_chain_valid,
            first_broken_index: first_broken,
            head_hash: previous,
            errors,
        })
    }

    /// [`Self::verify_chain`], turning any break into `TamperDetected`.
    pub fn ensure_intact(&self) -> Result<ChainVerification, LicenceError> {
        let report = self.verify_chain()?;
        if let Some(first) = report.errors.first() {
            return Err(LicenceError::tamper(first.clone())
                .with_hint("Repair or rotate the issuance log before issuing new tokens."));
        }
        Ok(report)
    }
}

/// Hash of the last entry in `raw`, `None` for a blank log.
fn last_entry_hash(raw: &str) -> Result<Option<String>, LicenceError> {
    let Some(last) = raw.lines().map(str::trim).filter(|l| !l.is_empty()).last() else {
        return Ok(None);
    };

    let entry: IssuanceLogEntry = serde_json::from_str(last).map_err(|e| {
        warn!(error = %e, "Issuance log tail is unreadable");
        LicenceError::tamper("Issuance log is not valid JSONL.")
            .with_hint("Repair or rotate the issuance log before issuing new tokens.")
    })?;

    Ok(Some(entry.entry_hash))
}
