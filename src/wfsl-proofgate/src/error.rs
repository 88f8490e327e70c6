//! ProofGate errors and exit codes.
//!
//! ProofGate keeps its own exit code space, independent of the licence
//! codes in `wfsl-licence-core`.

use std::path::PathBuf;

use thiserror::Error;

use crate::repo_guard::RepoGuardVerdict;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Ok = 0,
    /// Bad command line.
    Usage = 10,
    /// Signature mismatch or repo guard violation.
    VerifyFailed = 20,
    /// Unexpected failure.
    Internal = 30,
    /// A required file or manifest field is missing.
    NotFound = 40,
    /// Input present but malformed.
    InvalidInput = 41,
    /// A JSON document failed to parse.
    ParseError = 42,
}

impl ExitCode {
    /// Numeric process exit code.
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Errors raised by manifest verification and the repo guard.
#[derive(Debug, Error)]
pub enum ProofgateError {
    /// Bad command line.
    #[error("USAGE: {0}")]
    Usage(String),

    /// A referenced file does not exist or cannot be read.
    #[error("NOT_FOUND: {label} not found at {}", path.display())]
    NotFound {
        /// What the file is.
        label: String,
        /// Where it was looked for.
        path: PathBuf,
    },

    /// The manifest does not name a required input.
    #[error("NOT_FOUND: manifest does not declare {0}")]
    MissingInput(String),

    /// Input is present but malformed.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A JSON document failed to parse.
    #[error("PARSE_ERROR: {label} is not valid JSON")]
    Parse {
        /// Which document.
        label: String,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The signature did not verify.
    #[error("VERIFY_FAILED: {reason}")]
    VerifyFailed {
        /// Reason reported by the verifier.
        reason: String,
    },

    /// Repository hygiene checks failed.
    #[error("REPO_GUARD_FAILED")]
    RepoGuard(Box<RepoGuardVerdict>),

    /// The external verifier could not be run or gave no usable output.
    #[error("EXTERNAL_VERIFIER: {0}")]
    ExternalVerifier(String),

    /// Unexpected failure.
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl ProofgateError {
    /// Exit code class of this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) => ExitCode::Usage,
            Self::NotFound { .. } | Self::MissingInput(_) => ExitCode::NotFound,
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::Parse { .. } => ExitCode::ParseError,
            Self::VerifyFailed { .. } | Self::RepoGuard(_) => ExitCode::VerifyFailed,
            Self::ExternalVerifier(_) | Self::Internal(_) => ExitCode::Internal,
        }
    }

    pub(crate) fn not_found(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            label: label.into(),
            path: path.into(),
        }
    }

    pub(crate) fn parse(label: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            label: label.into(),
            source,
        }
    }
}
