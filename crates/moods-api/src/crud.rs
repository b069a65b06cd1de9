//! Generic handlers for many-per-owner resource families.
//!
//! Each route instantiates these for one [`Resource`] type, e.g.
//! `get(crud::list::<S, P, MoodEntry>)`.
//!
//! | Method   | Path          | Notes |
//! |----------|---------------|-------|
//! | `GET`    | `/<res>`      | `?skip=&limit=`, newest first |
//! | `POST`   | `/<res>`      | 201 with the stored record |
//! | `DELETE` | `/<res>`      | delete all of the caller's records |
//! | `GET`    | `/<res>/{id}` | 404 if absent or not the caller's |
//! | `PUT`    | `/<res>/{id}` | partial update |
//! | `DELETE` | `/<res>/{id}` | `{"msg": "<Label> deleted"}` |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use moods_core::{
  access::OwnerScope,
  provider::IdentityProvider,
  resource::{Owned, Resource, Updatable},
  store::{Page, RecordStore},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, bearer::CurrentUser, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub skip:  Option<usize>,
  pub limit: Option<usize>,
}

impl From<ListParams> for Page {
  fn from(p: ListParams) -> Self {
    Page::new(p.skip.unwrap_or(0), p.limit.unwrap_or(Page::DEFAULT_LIMIT))
  }
}

/// `GET /<res>[?skip=<n>&limit=<n>]`
pub async fn list<S, P, T>(
  State(state): State<AppState<S, P>>,
  CurrentUser(user): CurrentUser,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Owned<T>>>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
  T: Resource,
{
  let Query(params) = params?;
  let records = OwnerScope::new(state.store.as_ref(), &user)
    .list::<T>(params.into())
    .await
    .map_err(|e| ApiError::access(e, T::LABEL))?;
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /<res>`
pub async fn create<S, P, T>(
  State(state): State<AppState<S, P>>,
  CurrentUser(user): CurrentUser,
  body: Result<Json<T>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
  T: Resource,
{
  let Json(body) = body?;
  let created = OwnerScope::new(state.store.as_ref(), &user)
    .create(body)
    .await
    .map_err(|e| ApiError::access(e, T::LABEL))?;
  tracing::debug!(collection = T::COLLECTION.as_ref(), id = %created.id, "created record");
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /<res>/{id}`
pub async fn get_one<S, P, T>(
  State(state): State<AppState<S, P>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<String>,
) -> Result<Json<Owned<T>>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
  T: Resource,
{
  let record = OwnerScope::new(state.store.as_ref(), &user)
    .get::<T>(&id)
    .await
    .map_err(|e| ApiError::access(e, T::LABEL))?;
  Ok(Json(record))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /<res>/{id}`: only the fields present in the body change.
pub async fn update_one<S, P, T>(
  State(state): State<AppState<S, P>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<String>,
  body: Result<Json<T::Patch>, JsonRejection>,
) -> Result<Json<Owned<T>>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
  T: Updatable,
{
  let Json(patch) = body?;
  let record = OwnerScope::new(state.store.as_ref(), &user)
    .update::<T>(&id, &patch)
    .await
    .map_err(|e| ApiError::access(e, T::LABEL))?;
  Ok(Json(record))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /<res>/{id}`
pub async fn delete_one<S, P, T>(
  State(state): State<AppState<S, P>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
  T: Resource,
{
  OwnerScope::new(state.store.as_ref(), &user)
    .delete::<T>(&id)
    .await
    .map_err(|e| ApiError::access(e, T::LABEL))?;
  Ok(Json(json!({ "msg": format!("{} deleted", T::LABEL) })))
}

/// `DELETE /<res>`: not atomic; a failure part-way leaves the rest.
pub async fn delete_all<S, P, T>(
  State(state): State<AppState<S, P>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
  T: Resource,
{
  let deleted = OwnerScope::new(state.store.as_ref(), &user)
    .delete_all::<T>()
    .await
    .map_err(|e| ApiError::access(e, T::LABEL))?;
  let noun = T::COLLECTION.as_ref().replace('_', " ");
  Ok(Json(json!({ "msg": format!("Deleted {deleted} {noun}"), "deleted": deleted })))
}
