//! Owner-scoped access to a [`RecordStore`].
//!
//! An [`OwnerScope`] is built per request from a verified [`Identity`] and a
//! borrowed store handle, and is dropped when the request ends. Every
//! operation goes through it, which guarantees:
//!
//! - lists only ever contain the caller's records, newest first;
//! - created records carry the caller's id and a server timestamp, never
//!   values from the request body;
//! - reading, updating or deleting another owner's record is
//!   indistinguishable from the record not existing.

use chrono::{DateTime, SubsecRound as _, Utc};
use thiserror::Error;

use crate::{
  identity::Identity,
  resource::{Owned, Resource, Singleton, SingletonView, Updatable, from_payload, to_payload},
  store::{NewRecord, Page, Record, RecordStore, SingletonRecord},
};

#[derive(Debug, Error)]
pub enum AccessError<E: std::error::Error + 'static> {
  /// Absent, or owned by someone else.
  #[error("not found")]
  NotFound,

  #[error(transparent)]
  Invalid(#[from] crate::Error),

  #[error("storage error: {0}")]
  Store(#[source] E),
}

pub type AccessResult<T, E> = std::result::Result<T, AccessError<E>>;

/// The current time at microsecond precision, the finest every backend
/// stores.
pub fn server_now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// The caller's view of a store.
pub struct OwnerScope<'a, S> {
  store: &'a S,
  owner: &'a Identity,
}

impl<'a, S: RecordStore> OwnerScope<'a, S> {
  pub fn new(store: &'a S, owner: &'a Identity) -> Self { Self { store, owner } }

  pub fn owner_id(&self) -> &str { &self.owner.id }

  fn decode<T: Resource>(record: Record) -> AccessResult<Owned<T>, S::Error> {
    Ok(Owned {
      id:         record.id,
      owner_id:   record.owner_id,
      created_at: record.created_at,
      payload:    from_payload(record.payload)?,
    })
  }

  fn decode_singleton<T: Singleton>(record: SingletonRecord) -> AccessResult<SingletonView<T>, S::Error> {
    Ok(SingletonView {
      owner_id:   record.owner_id,
      updated_at: Some(record.updated_at),
      payload:    from_payload(record.payload)?,
    })
  }

  /// Resolve `id` and check it belongs to the caller.
  async fn owned_record<T: Resource>(&self, id: &str) -> AccessResult<Record, S::Error> {
    match self.store.get(T::COLLECTION, id).await.map_err(AccessError::Store)? {
      Some(record) if record.owner_id == self.owner.id => Ok(record),
      _ => Err(AccessError::NotFound),
    }
  }

  // ── Many-per-owner resources ──────────────────────────────────────────────

  /// The caller's records, newest first, paged.
  pub async fn list<T: Resource>(&self, page: Page) -> AccessResult<Vec<Owned<T>>, S::Error> {
    let native = self.store.sorts_natively();
    let mut records = self
      .store
      .list(T::COLLECTION, &self.owner.id, native.then_some(page))
      .await
      .map_err(AccessError::Store)?;

    records.retain(|r| r.owner_id == self.owner.id);

    if !native {
      records.sort_by(|a, b| {
        b.sort_at
          .cmp(&a.sort_at)
          .then_with(|| b.created_at.cmp(&a.created_at))
      });
      records = records.into_iter().skip(page.skip).take(page.limit).collect();
    }

    records.into_iter().map(Self::decode::<T>).collect()
  }

  /// Store `payload` as a new record owned by the caller.
  pub async fn create<T: Resource>(&self, payload: T) -> AccessResult<Owned<T>, S::Error> {
    payload.validate()?;
    let created_at = server_now();
    let new = NewRecord {
      owner_id: self.owner.id.clone(),
      created_at,
      sort_at: payload.sort_at(created_at),
      payload: to_payload(&payload)?,
    };
    let record = self
      .store
      .insert(T::COLLECTION, new)
      .await
      .map_err(AccessError::Store)?;
    Self::decode(record)
  }

  pub async fn get<T: Resource>(&self, id: &str) -> AccessResult<Owned<T>, S::Error> {
    Self::decode(self.owned_record::<T>(id).await?)
  }

  /// Apply the fields present in `patch`. Id, owner and creation time are
  /// never touched.
  pub async fn update<T: Updatable>(
    &self,
    id: &str,
    patch: &T::Patch,
  ) -> AccessResult<Owned<T>, S::Error> {
    let record = self.owned_record::<T>(id).await?;
    let patch = to_payload(patch)?;

    let mut merged = record.payload.clone();
    merged.extend(patch.clone());
    let updated: T = from_payload(merged)?;
    updated.validate()?;

    let record = self
      .store
      .update(T::COLLECTION, id, patch, updated.sort_at(record.created_at))
      .await
      .map_err(AccessError::Store)?
      .ok_or(AccessError::NotFound)?;
    Self::decode(record)
  }

  pub async fn delete<T: Resource>(&self, id: &str) -> AccessResult<(), S::Error> {
    self.owned_record::<T>(id).await?;
    let deleted = self
      .store
      .delete(T::COLLECTION, id)
      .await
      .map_err(AccessError::Store)?;
    if deleted { Ok(()) } else { Err(AccessError::NotFound) }
  }

  /// Delete all of the caller's records in the collection.
  pub async fn delete_all<T: Resource>(&self) -> AccessResult<u64, S::Error> {
    self
      .store
      .delete_owned(T::COLLECTION, &self.owner.id)
      .await
      .map_err(AccessError::Store)
  }

  // ── Singletons ────────────────────────────────────────────────────────────

  /// The caller's singleton, or its defaults when unset (stored first if
  /// the type asks for it).
  pub async fn singleton<T: Singleton>(&self) -> AccessResult<SingletonView<T>, S::Error> {
    let existing = self
      .store
      .get_singleton(T::COLLECTION, &self.owner.id)
      .await
      .map_err(AccessError::Store)?;

    match existing {
      Some(record) => Self::decode_singleton(record),
      None if T::PERSIST_DEFAULT => {
        let record = self
          .store
          .merge_singleton(T::COLLECTION, &self.owner.id, to_payload(&T::default())?, server_now())
          .await
          .map_err(AccessError::Store)?;
        Self::decode_singleton(record)
      }
      None => Ok(SingletonView {
        owner_id:   self.owner.id.clone(),
        updated_at: None,
        payload:    T::default(),
      }),
    }
  }

  /// Merge `patch` into the caller's singleton, creating it if needed.
  pub async fn merge_singleton<T: Singleton>(
    &self,
    patch: &T::Patch,
  ) -> AccessResult<SingletonView<T>, S::Error> {
    let patch = to_payload(patch)?;

    let mut merged = match self
      .store
      .get_singleton(T::COLLECTION, &self.owner.id)
      .await
      .map_err(AccessError::Store)?
    {
      Some(record) => record.payload,
      None => to_payload(&T::default())?,
    };
    merged.extend(patch.clone());
    let candidate: T = from_payload(merged)?;
    candidate.validate()?;

    let record = self
      .store
      .merge_singleton(T::COLLECTION, &self.owner.id, patch, server_now())
      .await
      .map_err(AccessError::Store)?;
    Self::decode_singleton(record)
  }
}
