//! Error type for `moods-identity`.

use moods_core::provider::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identity configuration: {0}")]
  Config(String),

  #[error("token encoding failed: {0}")]
  Token(#[from] jsonwebtoken::errors::Error),

  #[error("password hashing failed: {0}")]
  Hash(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for ProviderError {
  fn from(e: Error) -> Self { ProviderError::Unavailable(e.to_string()) }
}
