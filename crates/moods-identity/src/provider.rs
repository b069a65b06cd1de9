use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, info};
use uuid::Uuid;

use moods_core::provider::{
  AssertionClaims, IdentityProvider, InsertOutcome, ProviderError, ProviderUser, UserRecord,
  UserRegistry,
};

use crate::{
  IdentityConfig, Result,
  claims::{AssertionPayload, HANDOFF_AUDIENCE, HandoffPayload},
  password,
};

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn unavailable(e: impl std::fmt::Display) -> ProviderError { ProviderError::Unavailable(e.to_string()) }

/// An identity provider that keeps its users in a [`UserRegistry`].
pub struct LocalIdentityProvider<R> {
  registry:      Arc<R>,
  config:        IdentityConfig,
  assertion_enc: EncodingKey,
  assertion_dec: DecodingKey,
  handoff_enc:   EncodingKey,
  validation:    Validation,
}

impl<R: UserRegistry> LocalIdentityProvider<R> {
  pub fn new(registry: Arc<R>, config: IdentityConfig) -> Result<Self> {
    config.validate()?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

    Ok(Self {
      assertion_enc: EncodingKey::from_secret(config.assertion_secret.as_bytes()),
      assertion_dec: DecodingKey::from_secret(config.assertion_secret.as_bytes()),
      handoff_enc: EncodingKey::from_secret(config.handoff_secret.as_bytes()),
      validation,
      registry,
      config,
    })
  }

  pub fn registry(&self) -> &R { &self.registry }

  /// Issue a signed identity assertion for `user`.
  pub fn mint_assertion(&self, user: &ProviderUser) -> Result<String> {
    let now = Utc::now().timestamp();
    let payload = AssertionPayload {
      sub:   user.id.clone(),
      email: user.email.clone(),
      iss:   self.config.issuer.clone(),
      aud:   self.config.audience.clone(),
      iat:   now,
      exp:   now + self.config.assertion_ttl_secs,
    };
    Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), &payload, &self.assertion_enc)?)
  }
}

impl<R: UserRegistry> IdentityProvider for LocalIdentityProvider<R> {
  async fn verify_assertion(&self, token: &str) -> Result<AssertionClaims, ProviderError> {
    let data =
      jsonwebtoken::decode::<AssertionPayload>(token, &self.assertion_dec, &self.validation)
        .map_err(|e| ProviderError::InvalidAssertion(e.to_string()))?;
    Ok(AssertionClaims { subject: data.claims.sub, email: data.claims.email })
  }

  async fn lookup_user(&self, subject_id: &str) -> Result<ProviderUser, ProviderError> {
    match self.registry.user_by_id(subject_id).await.map_err(unavailable)? {
      Some(user) => Ok(user.into()),
      None => Err(ProviderError::UserNotFound(subject_id.to_owned())),
    }
  }

  async fn create_user(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
    let email = normalize_email(email);
    let record = UserRecord {
      id:            Uuid::new_v4().to_string(),
      email:         email.clone(),
      password_hash: password::hash(password)?,
      disabled:      false,
      created_at:    Utc::now(),
    };

    match self.registry.insert_user(record.clone()).await.map_err(unavailable)? {
      InsertOutcome::Inserted => {
        info!(user_id = %record.id, "registered user");
        Ok(record.into())
      }
      InsertOutcome::EmailTaken => Err(ProviderError::EmailExists(email)),
    }
  }

  async fn verify_password(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
    let user = self
      .registry
      .user_by_email(&normalize_email(email))
      .await
      .map_err(unavailable)?;

    match user {
      Some(user) if password::verify(password, &user.password_hash) => Ok(user.into()),
      Some(user) => {
        debug!(user_id = %user.id, "password mismatch");
        Err(ProviderError::InvalidCredentials)
      }
      None => Err(ProviderError::InvalidCredentials),
    }
  }

  async fn create_handoff_token(&self, subject_id: &str) -> Result<String, ProviderError> {
    let now = Utc::now().timestamp();
    let payload = HandoffPayload {
      uid: subject_id.to_owned(),
      iss: self.config.issuer.clone(),
      sub: self.config.issuer.clone(),
      aud: HANDOFF_AUDIENCE.to_owned(),
      iat: now,
      exp: now + self.config.handoff_ttl_secs,
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &payload, &self.handoff_enc)
      .map_err(|e| crate::Error::from(e).into())
  }
}
