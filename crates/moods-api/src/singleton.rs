//! Handlers for per-user singleton resources (settings, therapist info).

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use moods_core::{
  access::OwnerScope,
  provider::IdentityProvider,
  resource::{Singleton, SingletonView},
  store::RecordStore,
};

use crate::{AppState, bearer::CurrentUser, error::ApiError};

/// `GET`: the stored value, or the type's defaults when unset.
pub async fn get<S, P, T>(
  State(state): State<AppState<S, P>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<SingletonView<T>>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
  T: Singleton,
{
  let view = OwnerScope::new(state.store.as_ref(), &user)
    .singleton::<T>()
    .await
    .map_err(|e| ApiError::access(e, T::COLLECTION.as_ref()))?;
  Ok(Json(view))
}

/// `PUT`: merge the body into the stored value, creating it if needed.
pub async fn put<S, P, T>(
  State(state): State<AppState<S, P>>,
  CurrentUser(user): CurrentUser,
  body: Result<Json<T::Patch>, JsonRejection>,
) -> Result<Json<SingletonView<T>>, ApiError>
where
  S: RecordStore,
  P: IdentityProvider,
  T: Singleton,
{
  let Json(patch) = body?;
  let view = OwnerScope::new(state.store.as_ref(), &user)
    .merge_singleton::<T>(&patch)
    .await
    .map_err(|e| ApiError::access(e, T::COLLECTION.as_ref()))?;
  Ok(Json(view))
}
