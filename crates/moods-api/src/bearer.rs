//! Bearer-token extractor.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use moods_core::{Identity, provider::IdentityProvider, store::RecordStore};
use tracing::debug;

use crate::{AppState, error::ApiError};

/// The verified caller. Present in a handler means the request carried a
/// bearer token the verifier accepted.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

/// Pull the token out of an `Authorization: Bearer <token>` header. The
/// scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthenticated)?;

  let (scheme, token) = value.split_once(' ').ok_or(ApiError::Unauthenticated)?;
  let token = token.trim();
  if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
    return Err(ApiError::Unauthenticated);
  }
  Ok(token)
}

impl<S, P> FromRequestParts<AppState<S, P>> for CurrentUser
where
  S: RecordStore + 'static,
  P: IdentityProvider + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, P>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?;
    match state.verifier.verify(state.provider.as_ref(), token).await {
      Ok(identity) => Ok(CurrentUser(identity)),
      Err(failure) => {
        debug!(kind = failure.kind(), "rejected bearer credential");
        Err(failure.into())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn extracts_token_after_scheme() {
    assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    assert_eq!(bearer_token(&headers("bearer  xyz")).unwrap(), "xyz");
  }

  #[test]
  fn rejects_other_schemes_and_blank_tokens() {
    assert!(matches!(bearer_token(&headers("Basic dXNlcjpwdw==")), Err(ApiError::Unauthenticated)));
    assert!(matches!(bearer_token(&headers("Bearer ")), Err(ApiError::Unauthenticated)));
    assert!(matches!(bearer_token(&HeaderMap::new()), Err(ApiError::Unauthenticated)));
  }
}
