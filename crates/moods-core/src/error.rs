//! Error types for `moods-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A payload failed domain validation (range checks, empty fields, ...).
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
