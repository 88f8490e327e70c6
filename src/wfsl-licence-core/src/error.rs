//! Error taxonomy for licence operations.
//!
//! Every failure raised by this crate is a [`LicenceError`] carrying one
//! [`ErrorKind`] from the fixed catalogue. Kinds map 1:1 onto process exit
//! codes; the codes are part of the public contract and never change.

use thiserror::Error;

/// Failure kinds in the WFSL catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No token was presented.
    LicenceMissing,
    /// Token is malformed, unsigned, or has the wrong shape.
    LicenceInvalid,
    /// Token expiry is not in the future.
    LicenceExpired,
    /// Reserved for revocation-list checks.
    LicenceRevoked,
    /// Plan does not permit the operation.
    PlanInsufficient,
    /// Required feature is not part of the entitlement.
    FeatureDisabled,
    /// Wrong schema or protocol version.
    PolicyMismatch,
    /// Reserved for build-provenance checks.
    BuildUntrusted,
    /// Signature mismatch on an artifact expected to be internally consistent.
    TamperDetected,
    /// A required file operation failed.
    IoError,
    /// Bad caller input or missing configuration.
    ConfigError,
    /// Unexpected failure, including signing failures.
    InternalError,
}

impl ErrorKind {
    /// Every kind, in catalogue order.
    pub const ALL: [ErrorKind; 12] = [
        Self::LicenceMissing,
        Self::LicenceInvalid,
        Self::LicenceExpired,
        Self::LicenceRevoked,
        Self::PlanInsufficient,
        Self::FeatureDisabled,
        Self::PolicyMismatch,
        Self::BuildUntrusted,
        Self::TamperDetected,
        Self::IoError,
        Self::ConfigError,
        Self::InternalError,
    ];

    /// Stable code string, e.g. `WFSL_LICENCE_INVALID`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::LicenceMissing => "WFSL_LICENCE_MISSING",
            Self::LicenceInvalid => "WFSL_LICENCE_INVALID",
            Self::LicenceExpired => "WFSL_LICENCE_EXPIRED",
            Self::LicenceRevoked => "WFSL_LICENCE_REVOKED",
            Self::PlanInsufficient => "WFSL_PLAN_INSUFFICIENT",
            Self::FeatureDisabled => "WFSL_FEATURE_DISABLED",
            Self::PolicyMismatch => "WFSL_POLICY_MISMATCH",
            Self::BuildUntrusted => "WFSL_BUILD_UNTRUSTED",
            Self::TamperDetected => "WFSL_TAMPER_DETECTED",
            Self::IoError => "WFSL_IO_ERROR",
            Self::ConfigError => "WFSL_CONFIG_ERROR",
            Self::InternalError => "WFSL_INTERNAL_ERROR",
        }
    }

    /// Process exit code for this kind.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::LicenceMissing => 10,
            Self::LicenceInvalid => 11,
            Self::LicenceExpired => 12,
            Self::LicenceRevoked => 13,
            Self::PlanInsufficient => 14,
            Self::FeatureDisabled => 15,
            Self::PolicyMismatch => 16,
            Self::BuildUntrusted => 17,
            Self::TamperDetected => 18,
            Self::IoError => 19,
            Self::ConfigError => 20,
            Self::InternalError => 99,
        }
    }

    /// Human message shown at the process boundary.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::LicenceMissing => "Licence authority is required for this operation.",
            Self::LicenceInvalid => "Licence authority could not be verified.",
            Self::LicenceExpired => "Licence authority has expired.",
            Self::LicenceRevoked => "Licence authority has been revoked.",
            Self::PlanInsufficient => "Your current plan does not permit this operation.",
            Self::FeatureDisabled => "This feature is not enabled for your entitlement.",
            Self::PolicyMismatch => "The active policy does not permit this operation.",
            Self::BuildUntrusted => "This build cannot be verified as an official WFSL release.",
            Self::TamperDetected => "Integrity verification failed for this execution.",
            Self::IoError => "A required file operation failed.",
            Self::ConfigError => "Configuration is invalid or incomplete.",
            Self::InternalError => "An internal error occurred.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A catalogued licence failure with optional context.
///
/// `Display` renders only the catalogue message so that nothing about the
/// internal failure point leaks to the caller; `detail` and `hint` are for
/// logs and operator output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .kind.message())]
pub struct LicenceError {
    kind: ErrorKind,
    detail: Option<String>,
    hint: Option<String>,
}

impl LicenceError {
    /// Error of `kind` with no extra context.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            detail: None,
            hint: None,
        }
    }

    /// Attach a detail string.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach an operator hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// The catalogued kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Exit code for the kind.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// Detail, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Hint, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub(crate) fn missing(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::LicenceMissing).with_detail(detail)
    }

    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::LicenceInvalid).with_detail(detail)
    }

    pub(crate) fn tamper(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::TamperDetected).with_detail(detail)
    }

    pub(crate) fn io(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoError).with_detail(detail)
    }

    pub(crate) fn config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigError).with_detail(detail)
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError).with_detail(detail)
    }
}

impl From<ErrorKind> for LicenceError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
