//! The authenticated caller and the ways authentication can fail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The caller of a request, reconstructed from the bearer credential on
/// every request. Never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:     String,
  pub email:  Option<String>,
  #[serde(rename = "is_active")]
  pub active: bool,
}

/// Why a bearer credential was rejected.
///
/// All variants collapse to a single "authentication failed" outcome at the
/// HTTP boundary; the distinction exists for logs and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
  /// Neither a valid assertion nor a decodable token. `reason` is why the
  /// assertion check rejected it.
  #[error("Invalid token format: {reason}")]
  InvalidFormat { reason: String },

  /// A handoff-shaped token named a subject the provider does not know.
  #[error("User not found")]
  UserNotFound { subject: String },

  /// Decodable but of no recognised shape, or an unexpected error.
  #[error("{reason}")]
  Forbidden { reason: String },
}

impl AuthFailure {
  /// Short, stable label for log fields.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InvalidFormat { .. } => "invalid_format",
      Self::UserNotFound { .. } => "user_not_found",
      Self::Forbidden { .. } => "forbidden",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identity_serialises_active_flag_as_is_active() {
    let identity = Identity {
      id:     "u1".into(),
      email:  Some("a@example.com".into()),
      active: false,
    };
    let json = serde_json::to_value(&identity).unwrap();
    assert_eq!(json["is_active"], false);
    assert!(json.get("active").is_none());
  }

  #[test]
  fn failure_messages_carry_context() {
    let f = AuthFailure::InvalidFormat { reason: "bad signature".into() };
    assert_eq!(f.to_string(), "Invalid token format: bad signature");
    assert_eq!(f.kind(), "invalid_format");

    let f = AuthFailure::UserNotFound { subject: "ghost".into() };
    assert_eq!(f.to_string(), "User not found");
  }
}
