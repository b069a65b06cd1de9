//! The identity-provider contract and the user registry behind it.
//!
//! The provider is the password authority and the issuer of both token
//! shapes the verifier accepts. Implementations live outside this crate
//! (e.g. `moods-identity`); this module only fixes the interface.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Provider values ─────────────────────────────────────────────────────────

/// Claims extracted from a successfully verified identity assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
  pub subject: String,
  pub email:   Option<String>,
}

/// A user as reported by the provider's registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
  pub id:       String,
  pub email:    Option<String>,
  pub disabled: bool,
}

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("invalid assertion: {0}")]
  InvalidAssertion(String),

  #[error("no user record for subject {0}")]
  UserNotFound(String),

  #[error("email already registered: {0}")]
  EmailExists(String),

  #[error("invalid email or password")]
  InvalidCredentials,

  /// The provider or its backing registry could not be reached or failed.
  #[error("identity provider unavailable: {0}")]
  Unavailable(String),
}

// ─── Provider trait ──────────────────────────────────────────────────────────

/// Outbound interface to the identity provider.
///
/// Every method is one round trip; nothing is cached on this side.
pub trait IdentityProvider: Send + Sync {
  /// Validate a signed identity assertion and return its claims.
  fn verify_assertion<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<AssertionClaims, ProviderError>> + Send + 'a;

  /// Existence and status check for a subject. Unknown subjects yield
  /// [`ProviderError::UserNotFound`].
  fn lookup_user<'a>(
    &'a self,
    subject_id: &'a str,
  ) -> impl Future<Output = Result<ProviderUser, ProviderError>> + Send + 'a;

  /// Register a new user. Duplicate emails yield
  /// [`ProviderError::EmailExists`].
  fn create_user<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<ProviderUser, ProviderError>> + Send + 'a;

  /// Check an email/password pair and return the matching user.
  fn verify_password<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<ProviderUser, ProviderError>> + Send + 'a;

  /// Mint a handoff token for `subject_id`.
  fn create_handoff_token<'a>(
    &'a self,
    subject_id: &'a str,
  ) -> impl Future<Output = Result<String, ProviderError>> + Send + 'a;
}

// ─── User registry ───────────────────────────────────────────────────────────

/// A registered user as persisted by a [`UserRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
  pub id:            String,
  /// Stored lowercased; lookups by email are exact matches on this form.
  pub email:         String,
  /// argon2 PHC string.
  pub password_hash: String,
  pub disabled:      bool,
  pub created_at:    DateTime<Utc>,
}

impl From<UserRecord> for ProviderUser {
  fn from(u: UserRecord) -> Self {
    ProviderUser { id: u.id, email: Some(u.email), disabled: u.disabled }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  EmailTaken,
}

/// Persistence for the local identity provider's users. Implemented by the
/// storage backends so that users live alongside the data they own.
pub trait UserRegistry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert `user` unless its email is already registered.
  fn insert_user(
    &self,
    user: UserRecord,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + '_;

  fn user_by_id<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + 'a;

  fn user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + 'a;

  /// Enable or disable a user. Returns `false` if no such user exists.
  fn set_disabled<'a>(
    &'a self,
    id: &'a str,
    disabled: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
