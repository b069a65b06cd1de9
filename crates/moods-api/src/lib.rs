//! JSON REST API for the moods backend.
//!
//! Exposes an axum [`Router`] backed by any [`RecordStore`] and any
//! [`IdentityProvider`]. Every route under the API prefix except signup and
//! login requires an `Authorization: Bearer <token>` header, verified per
//! request by the [`CredentialVerifier`].

pub mod auth;
pub mod bearer;
pub mod crud;
pub mod error;
pub mod singleton;
pub mod users;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::State,
  http::HeaderValue,
  routing::{get, post},
};
use moods_core::{
  provider::IdentityProvider,
  resource::{
    Appointment, EmergencyContact, MoodEntry, Settings, TherapistInfo, TherapistTask,
  },
  store::RecordStore,
  verify::CredentialVerifier,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_project_name() -> String { "Moods API".to_owned() }

fn default_api_prefix() -> String { "/api/v1".to_owned() }

fn default_cors_origins() -> Vec<String> {
  vec!["http://localhost:3000".to_owned(), "http://localhost:8000".to_owned()]
}

/// HTTP-surface settings, deserialised from the server config.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_project_name")]
  pub project_name: String,
  #[serde(default = "default_api_prefix")]
  pub api_prefix:   String,
  /// Allowed CORS origins. `"*"` allows any origin.
  #[serde(default = "default_cors_origins")]
  pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      project_name: default_project_name(),
      api_prefix:   default_api_prefix(),
      cors_origins: default_cors_origins(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, P> {
  pub store:    Arc<S>,
  pub provider: Arc<P>,
  pub verifier: Arc<CredentialVerifier>,
  pub config:   Arc<ApiConfig>,
}

impl<S, P> Clone for AppState<S, P> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      provider: Arc::clone(&self.provider),
      verifier: Arc::clone(&self.verifier),
      config:   Arc::clone(&self.config),
    }
  }
}

impl<S, P> AppState<S, P> {
  /// State with the default verification chain.
  pub fn new(store: Arc<S>, provider: Arc<P>, config: ApiConfig) -> Self {
    Self {
      store,
      provider,
      verifier: Arc::new(CredentialVerifier::default()),
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Routes mounted under the API prefix.
fn api_routes<S, P>() -> Router<AppState<S, P>>
where
  S: RecordStore + 'static,
  P: IdentityProvider + 'static,
{
  Router::new()
    // Auth
    .route("/auth/signup", post(auth::signup::<S, P>))
    .route("/auth/login/access-token", post(auth::login::<S, P>))
    // Current user
    .route("/users/me", get(users::me))
    .route(
      "/users/me/settings",
      get(singleton::get::<S, P, Settings>).put(singleton::put::<S, P, Settings>),
    )
    .route(
      "/users/me/contacts",
      get(crud::list::<S, P, EmergencyContact>).post(crud::create::<S, P, EmergencyContact>),
    )
    .route(
      "/users/me/contacts/{id}",
      get(crud::get_one::<S, P, EmergencyContact>).delete(crud::delete_one::<S, P, EmergencyContact>),
    )
    // Therapist
    .route(
      "/users/me/therapist/info",
      get(singleton::get::<S, P, TherapistInfo>).put(singleton::put::<S, P, TherapistInfo>),
    )
    .route(
      "/users/me/therapist/tasks",
      get(crud::list::<S, P, TherapistTask>).post(crud::create::<S, P, TherapistTask>),
    )
    .route(
      "/users/me/therapist/tasks/{id}",
      get(crud::get_one::<S, P, TherapistTask>)
        .put(crud::update_one::<S, P, TherapistTask>)
        .delete(crud::delete_one::<S, P, TherapistTask>),
    )
    // Moods
    .route(
      "/moods",
      get(crud::list::<S, P, MoodEntry>)
        .post(crud::create::<S, P, MoodEntry>)
        .delete(crud::delete_all::<S, P, MoodEntry>),
    )
    .route(
      "/moods/{id}",
      get(crud::get_one::<S, P, MoodEntry>).delete(crud::delete_one::<S, P, MoodEntry>),
    )
    // Appointments
    .route(
      "/appointments",
      get(crud::list::<S, P, Appointment>).post(crud::create::<S, P, Appointment>),
    )
    .route(
      "/appointments/{id}",
      get(crud::get_one::<S, P, Appointment>).delete(crud::delete_one::<S, P, Appointment>),
    )
}

/// `GET /health`
async fn health<S, P>(State(state): State<AppState<S, P>>) -> Json<Value> {
  Json(json!({ "status": "ok", "app": state.config.project_name }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
  let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
  if origins.iter().any(|o| o == "*") {
    return layer.allow_origin(Any);
  }
  let origins: Vec<HeaderValue> = origins
    .iter()
    .filter_map(|o| match o.parse() {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
        None
      }
    })
    .collect();
  layer.allow_origin(origins)
}

/// Build the full application router: `/health` plus the API under the
/// configured prefix, with request tracing and CORS.
pub fn router<S, P>(state: AppState<S, P>) -> Router
where
  S: RecordStore + 'static,
  P: IdentityProvider + 'static,
{
  let prefix = format!("/{}", state.config.api_prefix.trim_matches('/'));
  let cors = cors_layer(&state.config.cors_origins);

  let app = Router::new().route("/health", get(health::<S, P>));
  let app = if prefix == "/" {
    app.merge(api_routes::<S, P>())
  } else {
    app.nest(&prefix, api_routes::<S, P>())
  };

  app
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
