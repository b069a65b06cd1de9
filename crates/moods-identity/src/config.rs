use serde::Deserialize;

use crate::{Error, Result};

fn default_issuer() -> String { "moods".to_owned() }

fn default_audience() -> String { "moods-app".to_owned() }

fn default_assertion_ttl() -> i64 { 60 * 60 }

fn default_handoff_ttl() -> i64 { 60 * 60 * 24 * 8 }

/// Keys and token lifetimes for [`LocalIdentityProvider`](crate::LocalIdentityProvider).
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
  pub assertion_secret:   String,
  pub handoff_secret:     String,
  #[serde(default = "default_issuer")]
  pub issuer:             String,
  #[serde(default = "default_audience")]
  pub audience:           String,
  #[serde(default = "default_assertion_ttl")]
  pub assertion_ttl_secs: i64,
  #[serde(default = "default_handoff_ttl")]
  pub handoff_ttl_secs:   i64,
}

impl IdentityConfig {
  /// A config with default issuer, audience and lifetimes.
  pub fn new(assertion_secret: impl Into<String>, handoff_secret: impl Into<String>) -> Self {
    Self {
      assertion_secret:   assertion_secret.into(),
      handoff_secret:     handoff_secret.into(),
      issuer:             default_issuer(),
      audience:           default_audience(),
      assertion_ttl_secs: default_assertion_ttl(),
      handoff_ttl_secs:   default_handoff_ttl(),
    }
  }

  /// Reject configs that would let one token shape pass for the other.
  pub fn validate(&self) -> Result<()> {
    if self.assertion_secret.is_empty() || self.handoff_secret.is_empty() {
      return Err(Error::Config("assertion and handoff secrets must be set".into()));
    }
    if self.assertion_secret == self.handoff_secret {
      return Err(Error::Config("assertion and handoff secrets must differ".into()));
    }
    if self.assertion_ttl_secs <= 0 || self.handoff_ttl_secs <= 0 {
      return Err(Error::Config("token lifetimes must be positive".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn secrets_must_be_distinct_and_present() {
    assert!(IdentityConfig::new("a", "b").validate().is_ok());
    assert!(matches!(IdentityConfig::new("a", "a").validate(), Err(Error::Config(_))));
    assert!(matches!(IdentityConfig::new("", "b").validate(), Err(Error::Config(_))));
  }

  #[test]
  fn lifetimes_default_to_an_hour_and_eight_days() {
    let cfg = IdentityConfig::new("a", "b");
    assert_eq!(cfg.assertion_ttl_secs, 3600);
    assert_eq!(cfg.handoff_ttl_secs, 691_200);
  }
}
