//! End-to-end tests driving the router with `oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use moods_core::{
  provider::{ProviderUser, UserRegistry},
  store::RecordStore,
};
use moods_identity::{IdentityConfig, LocalIdentityProvider};
use moods_store_document::DocumentStore;
use moods_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiConfig, AppState, router};

struct Harness<S> {
  app:      Router,
  provider: Arc<LocalIdentityProvider<S>>,
}

fn harness<S>(store: S) -> Harness<S>
where
  S: RecordStore + UserRegistry + 'static,
{
  let store = Arc::new(store);
  let provider = Arc::new(
    LocalIdentityProvider::new(store.clone(), IdentityConfig::new("assert-key", "handoff-key"))
      .unwrap(),
  );
  let state = AppState::new(store, provider.clone(), ApiConfig::default());
  Harness { app: router(state), provider }
}

async fn sqlite() -> Harness<SqliteStore> {
  harness(SqliteStore::open_in_memory().await.unwrap())
}

impl<S> Harness<S> {
  async fn send(
    &self,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value, axum::http::HeaderMap) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = self.app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json, headers)
  }

  async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
    let (s, v, _) = self.send(Method::GET, uri, Some(token), None).await;
    (s, v)
  }

  async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    let (s, v, _) = self.send(Method::POST, uri, Some(token), Some(body)).await;
    (s, v)
  }

  async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
    let (s, v, _) = self.send(Method::PUT, uri, Some(token), Some(body)).await;
    (s, v)
  }

  async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
    let (s, v, _) = self.send(Method::DELETE, uri, Some(token), None).await;
    (s, v)
  }

  async fn signup(&self, email: &str, password: &str) -> (StatusCode, Value) {
    let body = json!({ "email": email, "password": password });
    let (s, v, _) = self.send(Method::POST, "/api/v1/auth/signup", None, Some(body)).await;
    (s, v)
  }

  async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
    let req = Request::builder()
      .method(Method::POST)
      .uri("/api/v1/auth/login/access-token")
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(format!("username={email}&password={password}")))
      .unwrap();
    let resp = self.app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  /// Sign up and log in, returning a handoff token.
  async fn user(&self, email: &str) -> String {
    let (status, _) = self.signup(email, "pw").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = self.login(email, "pw").await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_owned()
  }
}

fn mood(mood: i32, energy: i32, stress: i32) -> Value {
  json!({ "mood_level": mood, "energy_level": energy, "stress_level": stress })
}

// ─── Health & auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_unprefixed_and_public() {
  let h = sqlite().await;
  let (status, body, _) = h.send(Method::GET, "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
  assert_eq!(body["app"], "Moods API");
}

#[tokio::test]
async fn signup_then_duplicate_conflicts() {
  let h = sqlite().await;
  let (status, body) = h.signup("a@example.com", "pw").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["email"], "a@example.com");
  assert_eq!(body["is_active"], true);
  assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));

  let (status, body) = h.signup("A@example.com", "other").await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn signup_validates_email() {
  let h = sqlite().await;
  let (status, body) = h.signup("not-an-email", "pw").await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn login_rejects_bad_password_and_inactive_users() {
  let h = sqlite().await;
  let (_, user) = h.signup("b@example.com", "pw").await;

  let (status, body) = h.login("b@example.com", "nope").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["detail"], "Incorrect email or password");

  let id = user["id"].as_str().unwrap();
  h.provider.registry().set_disabled(id, true).await.unwrap();
  let (status, body) = h.login("b@example.com", "pw").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["detail"], "Inactive user");
}

#[tokio::test]
async fn login_token_authenticates() {
  let h = sqlite().await;
  let token = h.user("c@example.com").await;
  let (status, me) = h.get("/api/v1/users/me", &token).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["email"], "c@example.com");
  assert_eq!(me["is_active"], true);
}

#[tokio::test]
async fn signed_assertion_authenticates() {
  let h = sqlite().await;
  let (_, user) = h.signup("d@example.com", "pw").await;
  let assertion = h
    .provider
    .mint_assertion(&ProviderUser {
      id:       user["id"].as_str().unwrap().to_owned(),
      email:    Some("d@example.com".into()),
      disabled: false,
    })
    .unwrap();

  let (status, me) = h.get("/api/v1/users/me", &assertion).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["id"], user["id"]);
}

#[tokio::test]
async fn missing_or_malformed_tokens_are_401() {
  let h = sqlite().await;

  let (status, body, headers) = h.send(Method::GET, "/api/v1/moods", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["detail"], "Not authenticated");
  assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer");

  let (status, body) = h.get("/api/v1/moods", "garbage").await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["detail"].as_str().unwrap().starts_with("Invalid token format"));
}

#[tokio::test]
async fn handoff_for_unknown_user_is_401() {
  let h = sqlite().await;
  use moods_core::provider::IdentityProvider as _;
  let token = h.provider.create_handoff_token("ghost").await.unwrap();
  let (status, body) = h.get("/api/v1/users/me", &token).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["detail"], "User not found");
}

// ─── Moods ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn created_mood_is_listed_first() {
  let h = sqlite().await;
  let token = h.user("m@example.com").await;

  h.post("/api/v1/moods", &token, mood(3, 3, 3)).await;
  tokio::time::sleep(std::time::Duration::from_millis(2)).await;
  let (status, created) = h.post("/api/v1/moods", &token, mood(8, 7, 2)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert!(created["id"].is_string());
  assert!(created["created_at"].is_string());
  assert_eq!(created["mood_level"], 8);

  let (status, list) = h.get("/api/v1/moods", &token).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(list.as_array().unwrap().len(), 2);
  assert_eq!(list[0], created);
  assert_eq!(list[0]["stress_level"], 2);

  let uri = format!("/api/v1/moods/{}", created["id"].as_str().unwrap());
  let (status, fetched) = h.get(&uri, &token).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["created_at"], created["created_at"]);
  assert_eq!(fetched, created);

  let (_, page) = h.get("/api/v1/moods?skip=1&limit=1", &token).await;
  assert_eq!(page.as_array().unwrap().len(), 1);
  assert_eq!(page[0]["mood_level"], 3);

  let (_, past_end) = h.get("/api/v1/moods?skip=18446744073709551615", &token).await;
  assert!(past_end.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn out_of_range_mood_is_422() {
  let h = sqlite().await;
  let token = h.user("v@example.com").await;
  let (status, body) = h.post("/api/v1/moods", &token, mood(11, 5, 5)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["detail"].as_str().unwrap().contains("mood_level"));

  let (status, _) = h.post("/api/v1/moods", &token, json!({ "mood_level": 5 })).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_all_on_empty_reports_zero() {
  let h = sqlite().await;
  let token = h.user("e@example.com").await;
  let (status, body) = h.delete("/api/v1/moods", &token).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["deleted"], 0);
  assert_eq!(body["msg"], "Deleted 0 mood entries");
}

#[tokio::test]
async fn body_user_id_is_ignored() {
  let h = sqlite().await;
  let token = h.user("f@example.com").await;
  let (_, me) = h.get("/api/v1/users/me", &token).await;

  let mut body = mood(5, 5, 5);
  body["user_id"] = json!("someone-else");
  body["id"] = json!("chosen-id");
  let (status, created) = h.post("/api/v1/moods", &token, body).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["user_id"], me["id"]);
  assert_ne!(created["id"], "chosen-id");
}

#[tokio::test]
async fn other_users_records_are_404() {
  let h = sqlite().await;
  let alice = h.user("alice@example.com").await;
  let bob = h.user("bob@example.com").await;

  let (_, created) = h.post("/api/v1/moods", &alice, mood(6, 6, 6)).await;
  let uri = format!("/api/v1/moods/{}", created["id"].as_str().unwrap());

  let (status, body) = h.get(&uri, &bob).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["detail"], "Mood entry not found");
  assert_eq!(h.delete(&uri, &bob).await.0, StatusCode::NOT_FOUND);
  assert_eq!(h.get("/api/v1/moods/does-not-exist", &bob).await.0, StatusCode::NOT_FOUND);

  let (_, bobs) = h.get("/api/v1/moods", &bob).await;
  assert!(bobs.as_array().unwrap().is_empty());

  assert_eq!(h.get(&uri, &alice).await.0, StatusCode::OK);
  let (status, body) = h.delete(&uri, &alice).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["msg"], "Mood entry deleted");
  assert_eq!(h.get(&uri, &alice).await.0, StatusCode::NOT_FOUND);
}

// ─── Users/me resources ───────────────────────────────────────────────────────

#[tokio::test]
async fn settings_default_then_merge() {
  let h = sqlite().await;
  let token = h.user("s@example.com").await;

  let (status, settings) = h.get("/api/v1/users/me/settings", &token).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(settings["theme"], "system");
  assert_eq!(settings["language"], "en");

  let (status, settings) = h
    .put("/api/v1/users/me/settings", &token, json!({ "theme": "dark", "notifications": false }))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(settings["theme"], "dark");
  assert_eq!(settings["language"], "en");
  assert_eq!(settings["notifications"], false);
}

#[tokio::test]
async fn contacts_crud() {
  let h = sqlite().await;
  let token = h.user("k@example.com").await;

  let (status, contact) = h
    .post(
      "/api/v1/users/me/contacts",
      &token,
      json!({ "name": "Mom", "phone": "555-0100", "relation": "mother" }),
    )
    .await;
  assert_eq!(status, StatusCode::CREATED);
  let uri = format!("/api/v1/users/me/contacts/{}", contact["id"].as_str().unwrap());

  let (_, fetched) = h.get(&uri, &token).await;
  assert_eq!(fetched["relation"], "mother");

  let (_, body) = h.delete(&uri, &token).await;
  assert_eq!(body["msg"], "Contact deleted");
  let (_, list) = h.get("/api/v1/users/me/contacts", &token).await;
  assert!(list.as_array().unwrap().is_empty());

  let (status, _) = h
    .post("/api/v1/users/me/contacts", &token, json!({ "name": "X", "phone": "" }))
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn therapist_info_and_tasks() {
  let h = sqlite().await;
  let token = h.user("t@example.com").await;

  let (status, info) = h.get("/api/v1/users/me/therapist/info", &token).await;
  assert_eq!(status, StatusCode::OK);
  assert!(info["name"].is_null());
  assert!(info["updated_at"].is_null());

  let (_, info) = h
    .put("/api/v1/users/me/therapist/info", &token, json!({ "name": "Dr. Rivera" }))
    .await;
  assert_eq!(info["name"], "Dr. Rivera");
  assert!(info["updated_at"].is_string());
  let (_, reread) = h.get("/api/v1/users/me/therapist/info", &token).await;
  assert_eq!(reread, info);

  let (status, task) = h
    .post("/api/v1/users/me/therapist/tasks", &token, json!({ "title": "Journal daily" }))
    .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(task["is_completed"], false);
  let uri = format!("/api/v1/users/me/therapist/tasks/{}", task["id"].as_str().unwrap());

  let (status, task) = h.put(&uri, &token, json!({ "is_completed": true })).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(task["is_completed"], true);
  assert_eq!(task["title"], "Journal daily");

  let (_, body) = h.delete(&uri, &token).await;
  assert_eq!(body["msg"], "Task deleted");
}

// ─── Appointments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn appointments_sorted_by_date() {
  let h = sqlite().await;
  let token = h.user("ap@example.com").await;

  for (title, date) in [
    ("first", "2030-01-05T10:00:00Z"),
    ("latest", "2030-03-01T09:30:00"),
    ("middle", "2030-02-01T12:00:00+01:00"),
  ] {
    let (status, _) = h
      .post("/api/v1/appointments", &token, json!({ "title": title, "date": date }))
      .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (_, list) = h.get("/api/v1/appointments", &token).await;
  let titles: Vec<&str> = list.as_array().unwrap().iter().map(|a| a["title"].as_str().unwrap()).collect();
  assert_eq!(titles, ["latest", "middle", "first"]);

  let (status, _) = h
    .post("/api/v1/appointments", &token, json!({ "title": "bad", "date": "tomorrow" }))
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ─── Document backend ─────────────────────────────────────────────────────────

#[tokio::test]
async fn document_backend_serves_the_same_api() {
  let h = harness(DocumentStore::in_memory());
  let alice = h.user("doc-a@example.com").await;
  let bob = h.user("doc-b@example.com").await;

  for level in [2, 9, 4] {
    h.post("/api/v1/moods", &alice, mood(level, 5, 5)).await;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
  }
  h.post("/api/v1/moods", &bob, mood(1, 1, 1)).await;

  let (_, list) = h.get("/api/v1/moods?limit=2", &alice).await;
  let levels: Vec<i64> = list.as_array().unwrap().iter().map(|m| m["mood_level"].as_i64().unwrap()).collect();
  assert_eq!(levels, [4, 9]);
  let (_, past_end) = h.get("/api/v1/moods?skip=18446744073709551615", &alice).await;
  assert!(past_end.as_array().unwrap().is_empty());

  let (_, body) = h.delete("/api/v1/moods", &alice).await;
  assert_eq!(body["deleted"], 3);
  let (_, list) = h.get("/api/v1/moods", &bob).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
}
