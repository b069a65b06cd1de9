//! Bearer credential verification.
//!
//! The provider issues two token shapes and the caller cannot know which one
//! it holds: client-verified identity assertions, and server-minted handoff
//! tokens that carry a subject id in their payload. [`CredentialVerifier`]
//! tries an ordered chain of [`Strategy`] values, each of which reports a
//! tagged [`Verification`]:
//!
//! 1. [`Strategy::SignedAssertion`] asks the provider to validate the token
//!    as an assertion. Any rejection is `NotApplicable`, and its reason is
//!    carried forward as context for later failures.
//! 2. [`Strategy::HandoffToken`] decodes the payload without verifying it.
//!    An undecodable token fails with [`AuthFailure::InvalidFormat`]; a
//!    payload without the [`HANDOFF_SUBJECT_CLAIM`] is `NotApplicable`;
//!    otherwise the subject is accepted only after a provider lookup
//!    confirms it exists.
//!
//! If every strategy is `NotApplicable` the token is `Forbidden`, with the
//! first recorded reason surfaced.

use tracing::debug;

use crate::{
  identity::{AuthFailure, Identity},
  provider::{IdentityProvider, ProviderError},
  token::decode_unverified,
};

/// The payload claim that marks a token as a handoff token.
pub const HANDOFF_SUBJECT_CLAIM: &str = "uid";

/// Result of one strategy's attempt at a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
  Verified(Identity),
  /// The token is not of this strategy's shape; try the next one.
  NotApplicable(String),
  /// The token is of this strategy's shape and is rejected. Stops the chain.
  Failed(AuthFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  SignedAssertion,
  HandoffToken,
}

impl Strategy {
  /// Try `token` against this strategy. `prior` is the first rejection
  /// reason recorded by an earlier strategy in the chain, if any.
  pub async fn attempt<P: IdentityProvider>(
    self,
    provider: &P,
    token: &str,
    prior: Option<&str>,
  ) -> Verification {
    match self {
      Self::SignedAssertion => signed_assertion(provider, token).await,
      Self::HandoffToken => handoff_token(provider, token, prior).await,
    }
  }
}

async fn signed_assertion<P: IdentityProvider>(provider: &P, token: &str) -> Verification {
  match provider.verify_assertion(token).await {
    Ok(claims) => Verification::Verified(Identity {
      id:     claims.subject,
      email:  claims.email,
      active: true,
    }),
    Err(e) => Verification::NotApplicable(e.to_string()),
  }
}

async fn handoff_token<P: IdentityProvider>(
  provider: &P,
  token: &str,
  prior: Option<&str>,
) -> Verification {
  let context = prior.unwrap_or("token is not a signed identity assertion");

  let payload = match decode_unverified(token) {
    Ok(p) => p,
    Err(e) => {
      debug!(error = %e, "bearer token does not decode");
      return Verification::Failed(AuthFailure::InvalidFormat { reason: context.to_owned() });
    }
  };

  let Some(claim) = payload.get(HANDOFF_SUBJECT_CLAIM) else {
    return Verification::NotApplicable(format!("payload has no `{HANDOFF_SUBJECT_CLAIM}` claim"));
  };

  let subject = match claim.as_str() {
    Some(s) if !s.is_empty() => s,
    _ => {
      return Verification::Failed(AuthFailure::Forbidden {
        reason: format!(
          "Could not validate credentials: `{HANDOFF_SUBJECT_CLAIM}` claim is not a non-empty string"
        ),
      });
    }
  };

  match provider.lookup_user(subject).await {
    Ok(user) => Verification::Verified(Identity {
      id:     user.id,
      email:  user.email,
      active: !user.disabled,
    }),
    Err(ProviderError::UserNotFound(_)) => {
      Verification::Failed(AuthFailure::UserNotFound { subject: subject.to_owned() })
    }
    Err(e) => Verification::Failed(AuthFailure::Forbidden {
      reason: format!("Could not validate credentials: {e}"),
    }),
  }
}

// ─── Verifier ────────────────────────────────────────────────────────────────

/// An ordered chain of verification strategies. Stateless: every call
/// re-verifies against the provider from scratch.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
  strategies: Vec<Strategy>,
}

impl Default for CredentialVerifier {
  fn default() -> Self { Self::new(vec![Strategy::SignedAssertion, Strategy::HandoffToken]) }
}

impl CredentialVerifier {
  pub fn new(strategies: Vec<Strategy>) -> Self { Self { strategies } }

  /// Verify `token`, returning the caller's identity or why it was refused.
  pub async fn verify<P: IdentityProvider>(
    &self,
    provider: &P,
    token: &str,
  ) -> Result<Identity, AuthFailure> {
    let mut first_reason: Option<String> = None;

    for strategy in &self.strategies {
      match strategy.attempt(provider, token, first_reason.as_deref()).await {
        Verification::Verified(identity) => {
          debug!(?strategy, subject = %identity.id, "bearer token verified");
          return Ok(identity);
        }
        Verification::Failed(failure) => {
          debug!(?strategy, kind = failure.kind(), "bearer token rejected");
          return Err(failure);
        }
        Verification::NotApplicable(reason) => {
          first_reason.get_or_insert(reason);
        }
      }
    }

    let reason = first_reason.unwrap_or_else(|| "no verification strategy configured".to_owned());
    debug!(kind = "forbidden", "no strategy accepted bearer token");
    Err(AuthFailure::Forbidden { reason: format!("Invalid token: {reason}") })
  }
}
