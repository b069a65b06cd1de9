//! The `RecordStore` trait: the storage capability every backend provides.
//!
//! Backends are deliberately dumb. They filter by owner on list, assign
//! unique ids on insert, and merge top-level keys on update. Ownership
//! checks, timestamps, and validation all happen in
//! [`OwnerScope`](crate::access::OwnerScope), so relational and document
//! backends are interchangeable.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::resource::Collection;

// ─── Records ─────────────────────────────────────────────────────────────────

/// A stored record in a many-per-owner collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
  pub id:         String,
  pub owner_id:   String,
  pub created_at: DateTime<Utc>,
  /// The designated ordering timestamp; lists are newest-first on this.
  pub sort_at:    DateTime<Utc>,
  pub payload:    Map<String, Value>,
}

/// A record to be inserted. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
  pub owner_id:   String,
  pub created_at: DateTime<Utc>,
  pub sort_at:    DateTime<Utc>,
  pub payload:    Map<String, Value>,
}

/// The single record of a per-owner singleton collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SingletonRecord {
  pub owner_id:   String,
  pub updated_at: DateTime<Utc>,
  pub payload:    Map<String, Value>,
}

// ─── Paging ──────────────────────────────────────────────────────────────────

/// Offset pagination over a newest-first list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub skip:  usize,
  pub limit: usize,
}

impl Page {
  pub const DEFAULT_LIMIT: usize = 100;
  pub const MAX_LIMIT: usize = 1000;

  /// Build a page, clamping `limit` to [`Page::MAX_LIMIT`].
  pub fn new(skip: usize, limit: usize) -> Self {
    Self { skip, limit: limit.min(Self::MAX_LIMIT) }
  }

  /// Every record, for callers that want the whole owner-filtered set.
  pub fn all() -> Self { Self { skip: 0, limit: usize::MAX } }
}

impl Default for Page {
  fn default() -> Self { Self::new(0, Self::DEFAULT_LIMIT) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a storage backend holding user-owned records.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether [`list`](Self::list) returns records newest-first by `sort_at`
  /// and honours `page`. Backends that cannot sort without an auxiliary
  /// index return `false` and leave ordering to the caller.
  fn sorts_natively(&self) -> bool;

  /// All records in `collection` owned by `owner_id`. `page` is only
  /// meaningful when [`sorts_natively`](Self::sorts_natively) is true.
  fn list<'a>(
    &'a self,
    collection: Collection,
    owner_id: &'a str,
    page: Option<Page>,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Persist a new record under a fresh unique id.
  fn insert(
    &self,
    collection: Collection,
    record: NewRecord,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Fetch a record by id regardless of owner. `None` if absent.
  fn get<'a>(
    &'a self,
    collection: Collection,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// Merge `patch` into a record's payload (top-level keys replace) and set
  /// its ordering timestamp. `None` if absent.
  fn update<'a>(
    &'a self,
    collection: Collection,
    id: &'a str,
    patch: Map<String, Value>,
    sort_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// Delete a record by id. Returns `false` if it did not exist.
  fn delete<'a>(
    &'a self,
    collection: Collection,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete every record owned by `owner_id`, returning how many went.
  /// Not necessarily atomic.
  fn delete_owned<'a>(
    &'a self,
    collection: Collection,
    owner_id: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  fn get_singleton<'a>(
    &'a self,
    collection: Collection,
    owner_id: &'a str,
  ) -> impl Future<Output = Result<Option<SingletonRecord>, Self::Error>> + Send + 'a;

  /// Upsert a singleton, merging `patch` into any existing payload.
  fn merge_singleton<'a>(
    &'a self,
    collection: Collection,
    owner_id: &'a str,
    patch: Map<String, Value>,
    updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<SingletonRecord, Self::Error>> + Send + 'a;
}
