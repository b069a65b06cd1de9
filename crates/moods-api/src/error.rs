//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure renders as `{"code": ..., "detail": ...}`.

use axum::{
  Json,
  extract::rejection::{FormRejection, JsonRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use moods_core::{AuthFailure, access::AccessError, provider::ProviderError};
use serde::Serialize;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No usable `Authorization: Bearer` header.
  #[error("Not authenticated")]
  Unauthenticated,

  #[error(transparent)]
  Auth(#[from] AuthFailure),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  BadRequest(String),

  /// A store or provider failure. Logged, never shown to the caller.
  #[error("upstream error: {0}")]
  Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
  code:   &'a str,
  detail: String,
}

impl ApiError {
  /// Map an accessor error, naming the resource in not-found details.
  pub fn access<E>(e: AccessError<E>, label: &str) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match e {
      AccessError::NotFound => Self::NotFound(format!("{label} not found")),
      AccessError::Invalid(e) => Self::Validation(e.to_string()),
      AccessError::Store(e) => Self::Upstream(Box::new(e)),
    }
  }

  fn parts(&self) -> (StatusCode, &'static str) {
    match self {
      Self::Unauthenticated | Self::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
      Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
      Self::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
      Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      Self::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error"),
    }
  }
}

impl From<ProviderError> for ApiError {
  fn from(e: ProviderError) -> Self {
    match e {
      ProviderError::EmailExists(_) => {
        Self::Conflict("The user with this username already exists in the system".into())
      }
      ProviderError::InvalidCredentials => Self::BadRequest("Incorrect email or password".into()),
      other => Self::Upstream(Box::new(other)),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { Self::Validation(r.body_text()) }
}

impl From<FormRejection> for ApiError {
  fn from(r: FormRejection) -> Self { Self::Validation(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { Self::Validation(r.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.parts();
    let detail = match &self {
      Self::Upstream(e) => {
        tracing::error!(error = %e, "upstream failure");
        "Internal server error".to_owned()
      }
      other => other.to_string(),
    };

    let mut res = (status, Json(ErrorBody { code, detail })).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}
