//! JWT payloads for the two token shapes.

use serde::{Deserialize, Serialize};

/// Audience stamped on handoff tokens. Never equal to an assertion audience.
pub const HANDOFF_AUDIENCE: &str = "moods-handoff";

/// Payload of a signed identity assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionPayload {
  pub sub:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  pub iss:   String,
  pub aud:   String,
  pub iat:   i64,
  pub exp:   i64,
}

/// Payload of a server-minted handoff token. `sub` names the issuing
/// service; the user travels in `uid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffPayload {
  pub uid: String,
  pub iss: String,
  pub sub: String,
  pub aud: String,
  pub iat: i64,
  pub exp: i64,
}
