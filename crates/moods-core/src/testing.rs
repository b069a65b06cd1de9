//! In-crate test doubles for the provider and storage interfaces.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::{
  provider::{AssertionClaims, IdentityProvider, ProviderError, ProviderUser},
  resource::Collection,
  store::{NewRecord, Page, Record, RecordStore, SingletonRecord},
};

// ─── Tokens ──────────────────────────────────────────────────────────────────

pub fn token_with_payload(payload: &Value) -> String {
  let header = B64URL.encode(serde_json::to_vec(&json!({"alg": "RS256", "typ": "JWT"})).unwrap());
  let body = B64URL.encode(serde_json::to_vec(payload).unwrap());
  format!("{header}.{body}.c2lnbmF0dXJl")
}

pub fn handoff_shaped(uid: &str) -> String {
  token_with_payload(&json!({"uid": uid, "iss": "svc@example.com", "exp": 4_102_444_800u64}))
}

// ─── Provider ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeProvider {
  assertions:      HashMap<String, AssertionClaims>,
  users:           HashMap<String, ProviderUser>,
  lookups:         AtomicUsize,
  failing_lookups: bool,
}

impl FakeProvider {
  pub fn with_assertion(mut self, token: &str, subject: &str, email: Option<&str>) -> Self {
    self.assertions.insert(token.into(), AssertionClaims {
      subject: subject.into(),
      email:   email.map(str::to_owned),
    });
    self
  }

  pub fn with_user(mut self, id: &str, email: &str, disabled: bool) -> Self {
    self.users.insert(id.into(), ProviderUser {
      id: id.into(),
      email: Some(email.into()),
      disabled,
    });
    self
  }

  pub fn failing_lookups(mut self) -> Self {
    self.failing_lookups = true;
    self
  }

  pub fn lookups(&self) -> usize { self.lookups.load(Ordering::SeqCst) }
}

impl IdentityProvider for FakeProvider {
  async fn verify_assertion(&self, token: &str) -> Result<AssertionClaims, ProviderError> {
    self
      .assertions
      .get(token)
      .cloned()
      .ok_or_else(|| ProviderError::InvalidAssertion("signature mismatch".into()))
  }

  async fn lookup_user(&self, subject_id: &str) -> Result<ProviderUser, ProviderError> {
    self.lookups.fetch_add(1, Ordering::SeqCst);
    if self.failing_lookups {
      return Err(ProviderError::Unavailable("registry offline".into()));
    }
    self
      .users
      .get(subject_id)
      .cloned()
      .ok_or_else(|| ProviderError::UserNotFound(subject_id.into()))
  }

  async fn create_user(&self, _: &str, _: &str) -> Result<ProviderUser, ProviderError> {
    unimplemented!()
  }

  async fn verify_password(&self, _: &str, _: &str) -> Result<ProviderUser, ProviderError> {
    unimplemented!()
  }

  async fn create_handoff_token(&self, subject_id: &str) -> Result<String, ProviderError> {
    Ok(handoff_shaped(subject_id))
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A vector-backed record store. With `native` unset it returns lists in
/// insertion order and ignores paging, like an index-less document store.
#[derive(Default)]
pub struct VecStore {
  pub native: bool,
  records:    Mutex<Vec<(Collection, Record)>>,
  singletons: Mutex<HashMap<(Collection, String), SingletonRecord>>,
  next_id:    AtomicUsize,
}

impl VecStore {
  pub fn native() -> Self { Self { native: true, ..Self::default() } }

  pub fn owner_of(&self, collection: Collection, id: &str) -> Option<String> {
    self
      .records
      .lock()
      .unwrap()
      .iter()
      .find(|(c, r)| *c == collection && r.id == id)
      .map(|(_, r)| r.owner_id.clone())
  }
}

impl RecordStore for VecStore {
  type Error = std::convert::Infallible;

  fn sorts_natively(&self) -> bool { self.native }

  async fn list(
    &self,
    collection: Collection,
    owner_id: &str,
    page: Option<Page>,
  ) -> Result<Vec<Record>, Self::Error> {
    let mut out: Vec<Record> = self
      .records
      .lock()
      .unwrap()
      .iter()
      .filter(|(c, r)| *c == collection && r.owner_id == owner_id)
      .map(|(_, r)| r.clone())
      .collect();
    if self.native {
      out.sort_by(|a, b| b.sort_at.cmp(&a.sort_at));
      if let Some(p) = page {
        out = out.into_iter().skip(p.skip).take(p.limit).collect();
      }
    }
    Ok(out)
  }

  async fn insert(&self, collection: Collection, new: NewRecord) -> Result<Record, Self::Error> {
    let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
    let record = Record {
      id,
      owner_id: new.owner_id,
      created_at: new.created_at,
      sort_at: new.sort_at,
      payload: new.payload,
    };
    self.records.lock().unwrap().push((collection, record.clone()));
    Ok(record)
  }

  async fn get(&self, collection: Collection, id: &str) -> Result<Option<Record>, Self::Error> {
    Ok(
      self
        .records
        .lock()
        .unwrap()
        .iter()
        .find(|(c, r)| *c == collection && r.id == id)
        .map(|(_, r)| r.clone()),
    )
  }

  async fn update(
    &self,
    collection: Collection,
    id: &str,
    patch: Map<String, Value>,
    sort_at: DateTime<Utc>,
  ) -> Result<Option<Record>, Self::Error> {
    let mut records = self.records.lock().unwrap();
    let Some((_, record)) = records.iter_mut().find(|(c, r)| *c == collection && r.id == id) else {
      return Ok(None);
    };
    record.payload.extend(patch);
    record.sort_at = sort_at;
    Ok(Some(record.clone()))
  }

  async fn delete(&self, collection: Collection, id: &str) -> Result<bool, Self::Error> {
    let mut records = self.records.lock().unwrap();
    let before = records.len();
    records.retain(|(c, r)| !(*c == collection && r.id == id));
    Ok(records.len() != before)
  }

  async fn delete_owned(&self, collection: Collection, owner_id: &str) -> Result<u64, Self::Error> {
    let mut records = self.records.lock().unwrap();
    let before = records.len();
    records.retain(|(c, r)| !(*c == collection && r.owner_id == owner_id));
    Ok((before - records.len()) as u64)
  }

  async fn get_singleton(
    &self,
    collection: Collection,
    owner_id: &str,
  ) -> Result<Option<SingletonRecord>, Self::Error> {
    Ok(self.singletons.lock().unwrap().get(&(collection, owner_id.to_owned())).cloned())
  }

  async fn merge_singleton(
    &self,
    collection: Collection,
    owner_id: &str,
    patch: Map<String, Value>,
    updated_at: DateTime<Utc>,
  ) -> Result<SingletonRecord, Self::Error> {
    let mut singletons = self.singletons.lock().unwrap();
    let entry = singletons
      .entry((collection, owner_id.to_owned()))
      .or_insert_with(|| SingletonRecord {
        owner_id: owner_id.to_owned(),
        updated_at,
        payload: Map::new(),
      });
    entry.payload.extend(patch);
    entry.updated_at = updated_at;
    Ok(entry.clone())
  }
}
