//! User-owned resource types.
//!
//! Each resource family is a plain payload struct plus a [`Resource`] (or
//! [`Singleton`]) impl naming its collection and ordering field. The owner
//! id, record id, and timestamps are never part of a payload; they are
//! stamped by the accessor and wrapped around it in [`Owned`] /
//! [`SingletonView`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{Error, Result};

// ─── Collections ─────────────────────────────────────────────────────────────

/// Storage collection a resource family lives in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
  MoodEntries,
  EmergencyContacts,
  TherapistTasks,
  Appointments,
  TherapistInfo,
  UserSettings,
}

/// Field names owned by the server. Stripped from every payload before it
/// reaches storage so a client can never set them.
pub const RESERVED_FIELDS: &[&str] = &["id", "user_id", "owner_id", "created_at", "updated_at"];

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A resource family with many records per owner.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
  const COLLECTION: Collection;

  /// Human-readable name of one record, e.g. `"Contact"`.
  const LABEL: &'static str;

  /// The timestamp lists are ordered by, newest first.
  fn sort_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> { created_at }

  fn validate(&self) -> Result<()> { Ok(()) }
}

/// A resource that supports partial updates. Fields serialised by the patch
/// are applied; absent fields are left untouched.
pub trait Updatable: Resource {
  type Patch: Serialize + DeserializeOwned + Send + Sync + 'static;
}

/// A resource family with at most one record per owner, keyed by owner id.
pub trait Singleton: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
  const COLLECTION: Collection;

  /// Whether reading an unset singleton stores the defaults.
  const PERSIST_DEFAULT: bool;

  type Patch: Serialize + DeserializeOwned + Send + Sync + 'static;

  fn validate(&self) -> Result<()> { Ok(()) }
}

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// A stored resource with its server-assigned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owned<T> {
  pub id:         String,
  #[serde(rename = "user_id")]
  pub owner_id:   String,
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub payload:    T,
}

/// A singleton resource. `updated_at` is `None` when nothing is stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingletonView<T> {
  #[serde(rename = "user_id")]
  pub owner_id:   String,
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub payload:    T,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
    .map(|naive| naive.and_utc())
    .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<DateTime<Utc>, D::Error> {
  let raw = String::deserialize(d)?;
  parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Serialise `value` to a JSON object with reserved fields removed.
pub fn to_payload<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
  match serde_json::to_value(value)? {
    Value::Object(mut map) => {
      for field in RESERVED_FIELDS {
        map.remove(*field);
      }
      Ok(map)
    }
    other => Err(Error::Validation(format!("payload must be a JSON object, got {other}"))),
  }
}

pub fn from_payload<T: DeserializeOwned>(payload: Map<String, Value>) -> Result<T> {
  Ok(serde_json::from_value(Value::Object(payload))?)
}

fn non_empty(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::Validation(format!("{field} must not be empty")));
  }
  Ok(())
}

fn level(field: &str, value: i32) -> Result<()> {
  if !(1..=10).contains(&value) {
    return Err(Error::Validation(format!("{field} must be between 1 and 10, got {value}")));
  }
  Ok(())
}

/// A loose `local@domain.tld` shape check.
pub fn email_shape(field: &str, value: &str) -> Result<()> {
  match value.split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
    _ => Err(Error::Validation(format!("{field} is not a valid email address"))),
  }
}

// ─── Mood entries ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
  pub mood_level:     i32,
  pub energy_level:   i32,
  pub stress_level:   i32,
  #[serde(default)]
  pub note:           Option<String>,
  /// Free-form client metrics; any JSON array or object.
  #[serde(default)]
  pub custom_metrics: Option<Value>,
}

impl Resource for MoodEntry {
  const COLLECTION: Collection = Collection::MoodEntries;
  const LABEL: &'static str = "Mood entry";

  fn validate(&self) -> Result<()> {
    level("mood_level", self.mood_level)?;
    level("energy_level", self.energy_level)?;
    level("stress_level", self.stress_level)?;
    match &self.custom_metrics {
      None | Some(Value::Null | Value::Array(_) | Value::Object(_)) => Ok(()),
      Some(_) => Err(Error::Validation("custom_metrics must be an array or an object".into())),
    }
  }
}

// ─── Emergency contacts ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
  pub name:     String,
  pub phone:    String,
  #[serde(default)]
  pub relation: Option<String>,
}

impl Resource for EmergencyContact {
  const COLLECTION: Collection = Collection::EmergencyContacts;
  const LABEL: &'static str = "Contact";

  fn validate(&self) -> Result<()> {
    non_empty("name", &self.name)?;
    non_empty("phone", &self.phone)
  }
}

// ─── Therapist tasks ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapistTask {
  pub title:        String,
  #[serde(default)]
  pub is_completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TherapistTaskPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_completed: Option<bool>,
}

impl Resource for TherapistTask {
  const COLLECTION: Collection = Collection::TherapistTasks;
  const LABEL: &'static str = "Task";

  fn validate(&self) -> Result<()> { non_empty("title", &self.title) }
}

impl Updatable for TherapistTask {
  type Patch = TherapistTaskPatch;
}

// ─── Appointments ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
  pub title: String,
  #[serde(deserialize_with = "lenient_timestamp")]
  pub date:  DateTime<Utc>,
  #[serde(default)]
  pub notes: Option<String>,
}

impl Resource for Appointment {
  const COLLECTION: Collection = Collection::Appointments;
  const LABEL: &'static str = "Appointment";

  fn sort_at(&self, _created_at: DateTime<Utc>) -> DateTime<Utc> { self.date }

  fn validate(&self) -> Result<()> { non_empty("title", &self.title) }
}

// ─── Therapist info ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TherapistInfo {
  #[serde(default)]
  pub name:  Option<String>,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TherapistInfoPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
}

impl Singleton for TherapistInfo {
  const COLLECTION: Collection = Collection::TherapistInfo;
  const PERSIST_DEFAULT: bool = false;

  type Patch = TherapistInfoPatch;

  fn validate(&self) -> Result<()> {
    match &self.email {
      Some(email) => email_shape("email", email),
      None => Ok(()),
    }
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

pub const DEFAULT_THEME: &str = "system";
pub const DEFAULT_LANGUAGE: &str = "en";

fn default_theme() -> String { DEFAULT_THEME.to_owned() }

fn default_language() -> String { DEFAULT_LANGUAGE.to_owned() }

/// Per-user settings. Keys other than `theme` and `language` are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  #[serde(default = "default_theme")]
  pub theme:    String,
  #[serde(default = "default_language")]
  pub language: String,
  #[serde(flatten)]
  pub extra:    Map<String, Value>,
}

impl Default for Settings {
  fn default() -> Self {
    Self { theme: default_theme(), language: default_language(), extra: Map::new() }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub theme:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub language: Option<String>,
  #[serde(flatten)]
  pub extra:    Map<String, Value>,
}

impl Singleton for Settings {
  const COLLECTION: Collection = Collection::UserSettings;
  const PERSIST_DEFAULT: bool = true;

  type Patch = SettingsPatch;

  fn validate(&self) -> Result<()> {
    non_empty("theme", &self.theme)?;
    non_empty("language", &self.language)
  }
}
