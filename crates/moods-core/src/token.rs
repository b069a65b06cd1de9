//! Unverified inspection of compact JWT-shaped tokens.
//!
//! Nothing decoded here is trusted as an identity. The verifier only uses
//! the claim shape to decide which provider lookup to run.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MalformedToken {
  #[error("expected 3 dot-separated segments, found {0}")]
  SegmentCount(usize),

  #[error("segment is not base64url: {0}")]
  Base64(#[from] base64::DecodeError),

  #[error("segment is not JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("segment is not a JSON object")]
  NotAnObject,
}

fn decode_segment(segment: &str) -> Result<Map<String, Value>, MalformedToken> {
  let bytes = B64URL.decode(segment.trim_end_matches('='))?;
  match serde_json::from_slice(&bytes)? {
    Value::Object(map) => Ok(map),
    _ => Err(MalformedToken::NotAnObject),
  }
}

/// Decode the payload of `token` without checking its signature.
///
/// The header must also decode to a JSON object; the signature segment is
/// ignored entirely.
pub fn decode_unverified(token: &str) -> Result<Map<String, Value>, MalformedToken> {
  let segments: Vec<&str> = token.split('.').collect();
  let [header, payload, _signature] = segments.as_slice() else {
    return Err(MalformedToken::SegmentCount(segments.len()));
  };
  decode_segment(header)?;
  decode_segment(payload)
}
