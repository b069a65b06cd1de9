//! Document shapes and the on-disk snapshot.

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use moods_core::{
  provider::UserRecord,
  resource::Collection,
  store::{Record, SingletonRecord},
};

use crate::{Error, Result};

/// A stored document in a many-per-owner collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub user_id:    String,
  pub created_at: DateTime<Utc>,
  pub sort_at:    DateTime<Utc>,
  pub fields:     Map<String, Value>,
}

impl Document {
  pub fn to_record(&self, id: &str) -> Record {
    Record {
      id:         id.to_owned(),
      owner_id:   self.user_id.clone(),
      created_at: self.created_at,
      sort_at:    self.sort_at,
      payload:    self.fields.clone(),
    }
  }
}

/// A singleton document, keyed by its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingletonDocument {
  pub updated_at: DateTime<Utc>,
  pub fields:     Map<String, Value>,
}

impl SingletonDocument {
  pub fn to_record(&self, owner_id: &str) -> SingletonRecord {
    SingletonRecord {
      owner_id:   owner_id.to_owned(),
      updated_at: self.updated_at,
      payload:    self.fields.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
  pub email:         String,
  pub password_hash: String,
  pub disabled:      bool,
  pub created_at:    DateTime<Utc>,
}

impl UserDocument {
  pub fn from_record(user: UserRecord) -> (String, Self) {
    (user.id, Self {
      email:         user.email,
      password_hash: user.password_hash,
      disabled:      user.disabled,
      created_at:    user.created_at,
    })
  }

  pub fn to_record(&self, id: &str) -> UserRecord {
    UserRecord {
      id:            id.to_owned(),
      email:         self.email.clone(),
      password_hash: self.password_hash.clone(),
      disabled:      self.disabled,
      created_at:    self.created_at,
    }
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything the store holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Documents {
  #[serde(default)]
  pub collections: HashMap<Collection, HashMap<String, Document>>,
  #[serde(default)]
  pub singletons:  HashMap<Collection, HashMap<String, SingletonDocument>>,
  #[serde(default)]
  pub users:       HashMap<String, UserDocument>,
}

impl Documents {
  /// Load a snapshot, or start empty if the file does not exist yet.
  pub async fn load(path: &Path) -> Result<Self> {
    match tokio::fs::read(path).await {
      Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(source) => Err(Error::Io { path: path.to_owned(), source }),
    }
  }

  /// Write the snapshot beside `path` and move it into place.
  pub async fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_vec(self)?;
    let tmp = path.with_extension("tmp");
    let io = |source| Error::Io { path: path.to_owned(), source };
    tokio::fs::write(&tmp, json).await.map_err(io)?;
    tokio::fs::rename(&tmp, path).await.map_err(io)?;
    Ok(())
  }
}
