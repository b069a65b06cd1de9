//! [`DocumentStore`]: the document implementation of [`RecordStore`] and
//! [`UserRegistry`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use moods_core::{
  provider::{InsertOutcome, UserRecord, UserRegistry},
  resource::Collection,
  store::{NewRecord, Page, Record, RecordStore, SingletonRecord},
};

use crate::{
  Error, Result,
  document::{Document, Documents, SingletonDocument, UserDocument},
};

/// An in-memory document store, optionally mirrored to a JSON snapshot.
///
/// Cloning is cheap; clones share the same documents.
#[derive(Clone, Default)]
pub struct DocumentStore {
  docs:     Arc<RwLock<Documents>>,
  snapshot: Option<PathBuf>,
}

impl DocumentStore {
  /// A store that lives only as long as the process.
  pub fn in_memory() -> Self { Self::default() }

  /// Open a store backed by the snapshot at `path`, creating it on the
  /// first write if it does not exist.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let docs = Documents::load(&path).await?;
    tracing::info!(
      path = %path.display(),
      users = docs.users.len(),
      "opened document store"
    );
    Ok(Self { docs: Arc::new(RwLock::new(docs)), snapshot: Some(path) })
  }

  /// Apply `change` under the write lock. With a snapshot, the change is
  /// made to a copy, which replaces the live documents only once it is
  /// saved; a failed save leaves memory as it was. `change` returns its
  /// output and whether it modified anything.
  async fn commit<T>(&self, change: impl FnOnce(&mut Documents) -> (T, bool)) -> Result<T> {
    let mut docs = self.docs.write().await;
    let Some(path) = &self.snapshot else {
      return Ok(change(&mut *docs).0);
    };

    let mut next = docs.clone();
    let (out, changed) = change(&mut next);
    if changed {
      next.save(path).await?;
      *docs = next;
    }
    Ok(out)
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for DocumentStore {
  type Error = Error;

  fn sorts_natively(&self) -> bool { false }

  async fn list(
    &self,
    collection: Collection,
    owner_id: &str,
    _page: Option<Page>,
  ) -> Result<Vec<Record>> {
    let docs = self.docs.read().await;
    let Some(coll) = docs.collections.get(&collection) else {
      return Ok(Vec::new());
    };
    Ok(
      coll
        .iter()
        .filter(|(_, doc)| doc.user_id == owner_id)
        .map(|(id, doc)| doc.to_record(id))
        .collect(),
    )
  }

  async fn insert(&self, collection: Collection, new: NewRecord) -> Result<Record> {
    let id = Uuid::new_v4().to_string();
    let doc = Document {
      user_id:    new.owner_id,
      created_at: new.created_at,
      sort_at:    new.sort_at,
      fields:     new.payload,
    };
    let record = doc.to_record(&id);

    self
      .commit(|docs| {
        docs.collections.entry(collection).or_default().insert(id, doc);
        ((), true)
      })
      .await?;
    Ok(record)
  }

  async fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>> {
    let docs = self.docs.read().await;
    Ok(
      docs
        .collections
        .get(&collection)
        .and_then(|coll| coll.get(id))
        .map(|doc| doc.to_record(id)),
    )
  }

  async fn update(
    &self,
    collection: Collection,
    id: &str,
    patch: Map<String, Value>,
    sort_at: DateTime<Utc>,
  ) -> Result<Option<Record>> {
    self
      .commit(|docs| {
        let Some(doc) = docs.collections.get_mut(&collection).and_then(|coll| coll.get_mut(id))
        else {
          return (None, false);
        };
        doc.fields.extend(patch);
        doc.sort_at = sort_at;
        (Some(doc.to_record(id)), true)
      })
      .await
  }

  async fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
    self
      .commit(|docs| {
        let removed = docs
          .collections
          .get_mut(&collection)
          .and_then(|coll| coll.remove(id))
          .is_some();
        (removed, removed)
      })
      .await
  }

  async fn delete_owned(&self, collection: Collection, owner_id: &str) -> Result<u64> {
    self
      .commit(|docs| {
        let Some(coll) = docs.collections.get_mut(&collection) else {
          return (0, false);
        };
        let before = coll.len();
        coll.retain(|_, doc| doc.user_id != owner_id);
        let deleted = (before - coll.len()) as u64;
        (deleted, deleted > 0)
      })
      .await
  }

  async fn get_singleton(
    &self,
    collection: Collection,
    owner_id: &str,
  ) -> Result<Option<SingletonRecord>> {
    let docs = self.docs.read().await;
    Ok(
      docs
        .singletons
        .get(&collection)
        .and_then(|coll| coll.get(owner_id))
        .map(|doc| doc.to_record(owner_id)),
    )
  }

  async fn merge_singleton(
    &self,
    collection: Collection,
    owner_id: &str,
    patch: Map<String, Value>,
    updated_at: DateTime<Utc>,
  ) -> Result<SingletonRecord> {
    self
      .commit(|docs| {
        let doc = docs
          .singletons
          .entry(collection)
          .or_default()
          .entry(owner_id.to_owned())
          .or_insert_with(|| SingletonDocument { updated_at, fields: Map::new() });
        doc.fields.extend(patch);
        doc.updated_at = updated_at;
        (doc.to_record(owner_id), true)
      })
      .await
  }
}

// ─── UserRegistry impl ───────────────────────────────────────────────────────

impl UserRegistry for DocumentStore {
  type Error = Error;

  async fn insert_user(&self, user: UserRecord) -> Result<InsertOutcome> {
    self
      .commit(|docs| {
        if docs.users.values().any(|u| u.email == user.email) {
          return (InsertOutcome::EmailTaken, false);
        }
        let (id, doc) = UserDocument::from_record(user);
        docs.users.insert(id, doc);
        (InsertOutcome::Inserted, true)
      })
      .await
  }

  async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
    let docs = self.docs.read().await;
    Ok(docs.users.get(id).map(|doc| doc.to_record(id)))
  }

  async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
    let docs = self.docs.read().await;
    Ok(
      docs
        .users
        .iter()
        .find(|(_, doc)| doc.email == email)
        .map(|(id, doc)| doc.to_record(id)),
    )
  }

  async fn set_disabled(&self, id: &str, disabled: bool) -> Result<bool> {
    self
      .commit(|docs| match docs.users.get_mut(id) {
        Some(user) => {
          user.disabled = disabled;
          (true, true)
        }
        None => (false, false),
      })
      .await
  }
}
