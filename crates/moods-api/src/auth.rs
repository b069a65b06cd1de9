//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/signup` | JSON `{"email","password"}`; 409 on a taken email |
//! | `POST` | `/auth/login/access-token` | form `username`, `password`; returns a handoff token |

use axum::{
  Form, Json,
  extract::{
    State,
    rejection::{FormRejection, JsonRejection},
  },
};
use moods_core::{
  Identity,
  access::OwnerScope,
  provider::IdentityProvider,
  resource::{Settings, email_shape},
  store::RecordStore,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, error::ApiError};

// ─── Signup ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/signup`
pub async fn signup<S, P>(
  State(state): State<AppState<S, P>>,
  body: Result<Json<SignupBody>, JsonRejection>,
) -> Result<Json<Identity>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
{
  let Json(body) = body?;
  email_shape("email", body.email.trim()).map_err(|e| ApiError::Validation(e.to_string()))?;
  if body.password.is_empty() {
    return Err(ApiError::Validation("password must not be empty".into()));
  }

  let user = state.provider.create_user(&body.email, &body.password).await?;
  let identity = Identity { id: user.id, email: user.email, active: !user.disabled };

  OwnerScope::new(state.store.as_ref(), &identity)
    .singleton::<Settings>()
    .await
    .map_err(|e| ApiError::access(e, "Settings"))?;

  info!(user_id = %identity.id, "signed up");
  Ok(Json(identity))
}

// ─── Login ────────────────────────────────────────────────────────────────────

/// OAuth2 password-grant form fields. `username` is the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub token_type:   String,
}

/// `POST /auth/login/access-token`
pub async fn login<S, P>(
  State(state): State<AppState<S, P>>,
  form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
{
  let Form(form) = form?;
  let user = state.provider.verify_password(&form.username, &form.password).await?;
  if user.disabled {
    return Err(ApiError::BadRequest("Inactive user".into()));
  }

  let access_token = state.provider.create_handoff_token(&user.id).await?;
  Ok(Json(TokenResponse { access_token, token_type: "bearer".to_owned() }))
}
