//! Layered server configuration: an optional TOML file under `MOODS_`
//! environment variables.
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 8000
//! api_prefix = "/api/v1"
//! cors_origins = ["http://localhost:3000"]
//!
//! [store]
//! backend = "sqlite"          # or "document"
//! path = "~/.local/share/moods/moods.db"
//!
//! [identity]
//! assertion_secret = "..."
//! handoff_secret = "..."
//! ```
//!
//! Nested keys use `__` in the environment, e.g. `MOODS_STORE__BACKEND`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use moods_api::ApiConfig;
use moods_identity::IdentityConfig;
use serde::Deserialize;

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8000 }

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:     String,
  #[serde(default = "default_port")]
  pub port:     u16,
  #[serde(flatten)]
  pub api:      ApiConfig,
  #[serde(default)]
  pub store:    StoreConfig,
  pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  #[default]
  Sqlite,
  Document,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
  #[serde(default)]
  pub backend: Backend,
  /// Database file for `sqlite`, snapshot file for `document`. When unset,
  /// both backends run in memory.
  pub path:    Option<PathBuf>,
}

impl ServerConfig {
  /// Read `path` (if it exists) and overlay `MOODS_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(
        Environment::with_prefix("MOODS")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("cors_origins"),
      );
    Self::build(builder).with_context(|| format!("failed to load config from {path:?}"))
  }

  fn build(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
    let cfg: Self = builder
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.identity.validate().context("invalid [identity] settings")?;
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
