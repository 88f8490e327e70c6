//! Pro gating.
//!
//! [`require_capability`] is the single gate privileged tooling calls before
//! doing Pro work. It returns an authority only when every check passes;
//! there is no partially-permitted outcome to ignore.

use tracing::{debug, instrument};
use wfsl_crypto::DetachedVerifier;

use crate::config::{LicenceConfig, PRO_PLAN};
use crate::entitlement::{self, VerifiedAuthority};
use crate::error::{ErrorKind, LicenceError};
use crate::keys::{load_verifier, KeyProvider, TokenSource};

/// Verify `token` and require the Pro plan plus `required_feature`, if any.
pub fn require_capability(
    token: &str,
    verifier: &dyn DetachedVerifier,
    required_feature: Option<&str>,
) -> Result<VerifiedAuthority, LicenceError> {
    require_capability_at(token, verifier, required_feature, entitlement::unix_now())
}

/// [`require_capability`] with an explicit clock.
#[instrument(skip(token, verifier))]
pub fn require_capability_at(
    token: &str,
    verifier: &dyn DetachedVerifier,
    required_feature: Option<&str>,
    now: i64,
) -> Result<VerifiedAuthority, LicenceError> {
    let authority = entitlement::verify_at(token, verifier, now)?;
    check_authority(&authority, required_feature)?;
    debug!(sub = %authority.subject(), "Capability granted");
    Ok(authority)
}

fn check_authority(
    authority: &VerifiedAuthority,
    required_feature: Option<&str>,
) -> Result<(), LicenceError> {
    if authority.plan() != PRO_PLAN {
        return Err(LicenceError::new(ErrorKind::PlanInsufficient).with_detail(format!(
            "Plan '{}' does not permit Pro operations.",
            authority.plan()
        )));
    }

    // An empty feature name requires nothing beyond the plan.
    if let Some(feature) = required_feature.filter(|f| !f.is_empty()) {
        if !authority.has_feature(feature) {
            return Err(LicenceError::new(ErrorKind::FeatureDisabled)
                .with_detail(format!("Required feature '{feature}' not enabled.")));
        }
    }

    Ok(())
}

/// Enforcer wired to a token source and a key provider.
pub struct Enforcer<'a> {
    token_source: &'a TokenSource,
    keys: &'a dyn KeyProvider,
}

impl<'a> Enforcer<'a> {
    /// Enforcer over explicit collaborators.
    pub fn new(token_source: &'a TokenSource, keys: &'a dyn KeyProvider) -> Self {
        Self { token_source, keys }
    }

    /// Enforcer reading the token source from `config` and keys from `keys`.
    pub fn from_config(config: &'a LicenceConfig, keys: &'a dyn KeyProvider) -> Self {
        Self::new(&config.token_source, keys)
    }

    /// Load the token and public key, then apply [`require_capability`].
    pub fn require_pro(
        &self,
        required_feature: Option<&str>,
    ) -> Result<VerifiedAuthority, LicenceError> {
        let token = self.token_source.load()?;
        let verifier = load_verifier(self.keys)?;
        require_capability(&token, &verifier, required_feature)
    }
}
