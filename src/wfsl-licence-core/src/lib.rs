//! # wfsl-licence-core
//!
//! Licence trust core for WFSL tools: signed entitlement tokens, the
//! append-only issuance ledger, Pro gating and signed execution receipts.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  Issuer side                                               │
//! │                                                            │
//! │  EntitlementParams ──build──▶ Entitlement ──issue──▶ token │
//! │                                     │                      │
//! │                                     ▼                      │
//! │                           IssuanceLedger::append           │
//! │                          (sha256 hash chain, JSONL)        │
//! └────────────────────────────────────────────────────────────┘
//!                               │ token
//!                               ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │  Tool side                                                 │
//! │                                                            │
//! │  verify ──▶ VerifiedAuthority ──require_capability──▶ run  │
//! │                                                    │       │
//! │                                                    ▼       │
//! │                                      issue_receipt(output) │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//!
//! - **Fail-closed**: every failure is a typed [`LicenceError`] with a stable
//!   code; there is no degraded success path
//! - **Tamper-evident**: any change to a token payload, signature or receipt
//!   fails verification
//! - **No ambient state**: keys and tokens arrive through [`KeyProvider`] and
//!   [`TokenSource`]; only binaries read the environment

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::pedantic)] // Too strict for production code
#![allow(clippy::doc_markdown)] // Allow product names without backticks
#![allow(clippy::missing_errors_doc)] // Error documentation not required
#![allow(clippy::module_name_repetitions)] // Allow Type in module::Type
#![allow(clippy::must_use_candidate)] // Not all functions need must_use

pub mod config;
pub mod enforcer;
pub mod entitlement;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod receipt;

pub use config::{LicenceConfig, DEFAULT_ISSUER, PRO_PLAN, SCHEMA_VERSION};
pub use enforcer::{require_capability, require_capability_at, Enforcer};
pub use entitlement::{
    build, build_at, issue, verify, verify_at, Entitlement, EntitlementParams, IssuedToken,
    VerifiedAuthority,
};
pub use error::{ErrorKind, LicenceError};
pub use keys::{
    load_signer, load_verifier, parse_signer, parse_verifier, FileKeyProvider, KeyProvider,
    StaticKeyProvider, TokenSource,
};
pub use ledger::{ChainVerification, IssuanceLedger, IssuanceLogEntry};
pub use receipt::{
    issue_receipt, output_hash, verify_receipt, Receipt, ReceiptRequest, SignedReceipt,
};
