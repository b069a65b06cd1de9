//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`] and
//! [`UserRegistry`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use serde_json::{Map, Value};
use uuid::Uuid;

use moods_core::{
  provider::{InsertOutcome, UserRecord, UserRegistry},
  resource::Collection,
  store::{NewRecord, Page, Record, RecordStore, SingletonRecord},
};

use crate::{
  Error, Result,
  encode::{
    RECORD_COLUMNS, RawRecord, RawSingleton, RawUser, USER_COLUMNS, decode_payload,
    encode_collection, encode_dt, encode_payload, stored_dt,
  },
  schema::SCHEMA,
};

/// Wrap a non-SQLite error raised inside a connection closure.
fn other(e: impl std::error::Error + Send + Sync + 'static) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

/// SQLite `LIMIT` value; `-1` means unbounded.
fn sql_limit(n: usize) -> i64 { i64::try_from(n).unwrap_or(-1) }

/// SQLite `OFFSET` value. A negative offset reads as zero, so saturate.
fn sql_offset(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A moods store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_where(&self, column: &'static str, value: String) -> Result<Option<UserRecord>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
              rusqlite::params![value],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  fn sorts_natively(&self) -> bool { true }

  async fn list(
    &self,
    collection: Collection,
    owner_id: &str,
    page: Option<Page>,
  ) -> Result<Vec<Record>> {
    let collection = encode_collection(collection);
    let owner_id = owner_id.to_owned();
    let page = page.unwrap_or_else(Page::all);
    let limit = sql_limit(page.limit);
    let offset = sql_offset(page.skip);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM records
           WHERE collection = ?1 AND owner_id = ?2
           ORDER BY sort_at DESC, created_at DESC
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![collection, owner_id, limit, offset],
            RawRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn insert(&self, collection: Collection, new: NewRecord) -> Result<Record> {
    let record = Record {
      id:         Uuid::new_v4().to_string(),
      owner_id:   new.owner_id,
      created_at: stored_dt(new.created_at),
      sort_at:    stored_dt(new.sort_at),
      payload:    new.payload,
    };

    let id_str         = record.id.clone();
    let collection_str = encode_collection(collection);
    let owner_str      = record.owner_id.clone();
    let created_str    = encode_dt(record.created_at);
    let sort_str       = encode_dt(record.sort_at);
    let payload_str    = encode_payload(&record.payload)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO records (record_id, collection, owner_id, created_at, sort_at, payload)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, collection_str, owner_str, created_str, sort_str, payload_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>> {
    let collection = encode_collection(collection);
    let id = id.to_owned();

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECORD_COLUMNS} FROM records WHERE collection = ?1 AND record_id = ?2"
              ),
              rusqlite::params![collection, id],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn update(
    &self,
    collection: Collection,
    id: &str,
    patch: Map<String, Value>,
    sort_at: DateTime<Utc>,
  ) -> Result<Option<Record>> {
    let collection = encode_collection(collection);
    let id = id.to_owned();
    let sort_str = encode_dt(sort_at);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<String> = tx
          .query_row(
            "SELECT payload FROM records WHERE collection = ?1 AND record_id = ?2",
            rusqlite::params![collection, id],
            |r| r.get(0),
          )
          .optional()?;

        let Some(current) = current else {
          return Ok(None);
        };

        let mut payload = decode_payload(&id, &current).map_err(other)?;
        payload.extend(patch);
        let payload_str = encode_payload(&payload).map_err(other)?;

        tx.execute(
          "UPDATE records SET payload = ?1, sort_at = ?2
           WHERE collection = ?3 AND record_id = ?4",
          rusqlite::params![payload_str, sort_str, collection, id],
        )?;

        let updated = tx.query_row(
          &format!("SELECT {RECORD_COLUMNS} FROM records WHERE collection = ?1 AND record_id = ?2"),
          rusqlite::params![collection, id],
          RawRecord::from_row,
        )?;
        tx.commit()?;
        Ok(Some(updated))
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
    let collection = encode_collection(collection);
    let id = id.to_owned();

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM records WHERE collection = ?1 AND record_id = ?2",
          rusqlite::params![collection, id],
        )?)
      })
      .await?;

    Ok(n > 0)
  }

  async fn delete_owned(&self, collection: Collection, owner_id: &str) -> Result<u64> {
    let collection = encode_collection(collection);
    let owner_id = owner_id.to_owned();

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM records WHERE collection = ?1 AND owner_id = ?2",
          rusqlite::params![collection, owner_id],
        )?)
      })
      .await?;

    Ok(n as u64)
  }

  async fn get_singleton(
    &self,
    collection: Collection,
    owner_id: &str,
  ) -> Result<Option<SingletonRecord>> {
    let collection = encode_collection(collection);
    let owner_id = owner_id.to_owned();

    let raw: Option<RawSingleton> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT owner_id, updated_at, payload FROM singletons
               WHERE collection = ?1 AND owner_id = ?2",
              rusqlite::params![collection, owner_id],
              |row| {
                Ok(RawSingleton {
                  owner_id:   row.get(0)?,
                  updated_at: row.get(1)?,
                  payload:    row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSingleton::into_singleton).transpose()
  }

  async fn merge_singleton(
    &self,
    collection: Collection,
    owner_id: &str,
    patch: Map<String, Value>,
    updated_at: DateTime<Utc>,
  ) -> Result<SingletonRecord> {
    let collection = encode_collection(collection);
    let owner_str = owner_id.to_owned();
    let updated_at = stored_dt(updated_at);
    let at_str = encode_dt(updated_at);

    let payload: Map<String, Value> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<String> = tx
          .query_row(
            "SELECT payload FROM singletons WHERE collection = ?1 AND owner_id = ?2",
            rusqlite::params![collection, owner_str],
            |r| r.get(0),
          )
          .optional()?;

        let mut payload = match current {
          Some(s) => decode_payload(&owner_str, &s).map_err(other)?,
          None => Map::new(),
        };
        payload.extend(patch);
        let payload_str = encode_payload(&payload).map_err(other)?;

        tx.execute(
          "INSERT INTO singletons (collection, owner_id, updated_at, payload)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (collection, owner_id)
           DO UPDATE SET updated_at = excluded.updated_at, payload = excluded.payload",
          rusqlite::params![collection, owner_str, at_str, payload_str],
        )?;
        tx.commit()?;
        Ok(payload)
      })
      .await?;

    Ok(SingletonRecord { owner_id: owner_id.to_owned(), updated_at, payload })
  }
}

// ─── UserRegistry impl ───────────────────────────────────────────────────────

impl UserRegistry for SqliteStore {
  type Error = Error;

  async fn insert_user(&self, user: UserRecord) -> Result<InsertOutcome> {
    let created_str = encode_dt(user.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO users (user_id, email, password_hash, disabled, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![user.id, user.email, user.password_hash, user.disabled, created_str],
        );
        match inserted {
          Ok(_) => Ok(InsertOutcome::Inserted),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(InsertOutcome::EmailTaken)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(outcome)
  }

  async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
    self.user_where("user_id", id.to_owned()).await
  }

  async fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
    self.user_where("email", email.to_owned()).await
  }

  async fn set_disabled(&self, id: &str, disabled: bool) -> Result<bool> {
    let id = id.to_owned();
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET disabled = ?1 WHERE user_id = ?2",
          rusqlite::params![disabled, id],
        )?)
      })
      .await?;
    Ok(n > 0)
  }
}
