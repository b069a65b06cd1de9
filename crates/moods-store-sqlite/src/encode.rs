//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order in SQL equals time order.
//! Payloads are stored as compact JSON objects.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use moods_core::{
  provider::UserRecord,
  resource::Collection,
  store::{Record, SingletonRecord},
};
use serde_json::{Map, Value};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

/// `dt` as it reads back after [`encode_dt`].
pub fn stored_dt(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Collection ──────────────────────────────────────────────────────────────

pub fn encode_collection(c: Collection) -> &'static str {
  match c {
    Collection::MoodEntries => "mood_entries",
    Collection::EmergencyContacts => "emergency_contacts",
    Collection::TherapistTasks => "therapist_tasks",
    Collection::Appointments => "appointments",
    Collection::TherapistInfo => "therapist_info",
    Collection::UserSettings => "user_settings",
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

pub fn encode_payload(p: &Map<String, Value>) -> Result<String> { Ok(serde_json::to_string(p)?) }

pub fn decode_payload(key: &str, s: &str) -> Result<Map<String, Value>> {
  match serde_json::from_str(s)? {
    Value::Object(map) => Ok(map),
    _ => Err(Error::CorruptPayload(key.to_owned())),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `records` row as read from SQLite, before decoding.
pub struct RawRecord {
  pub record_id:  String,
  pub owner_id:   String,
  pub created_at: String,
  pub sort_at:    String,
  pub payload:    String,
}

pub const RECORD_COLUMNS: &str = "record_id, owner_id, created_at, sort_at, payload";

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:  row.get(0)?,
      owner_id:   row.get(1)?,
      created_at: row.get(2)?,
      sort_at:    row.get(3)?,
      payload:    row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      created_at: decode_dt(&self.created_at)?,
      sort_at:    decode_dt(&self.sort_at)?,
      payload:    decode_payload(&self.record_id, &self.payload)?,
      id:         self.record_id,
      owner_id:   self.owner_id,
    })
  }
}

/// A `singletons` row as read from SQLite, before decoding.
pub struct RawSingleton {
  pub owner_id:   String,
  pub updated_at: String,
  pub payload:    String,
}

impl RawSingleton {
  pub fn into_singleton(self) -> Result<SingletonRecord> {
    Ok(SingletonRecord {
      updated_at: decode_dt(&self.updated_at)?,
      payload:    decode_payload(&self.owner_id, &self.payload)?,
      owner_id:   self.owner_id,
    })
  }
}

/// A `users` row as read from SQLite, before decoding.
pub struct RawUser {
  pub user_id:       String,
  pub email:         String,
  pub password_hash: String,
  pub disabled:      bool,
  pub created_at:    String,
}

pub const USER_COLUMNS: &str = "user_id, email, password_hash, disabled, created_at";

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      email:         row.get(1)?,
      password_hash: row.get(2)?,
      disabled:      row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<UserRecord> {
    Ok(UserRecord {
      created_at:    decode_dt(&self.created_at)?,
      id:            self.user_id,
      email:         self.email,
      password_hash: self.password_hash,
      disabled:      self.disabled,
    })
  }
}
