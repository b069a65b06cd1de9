//! moods server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! configured storage backend, and serves the JSON API over HTTP.

mod config;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use moods_api::AppState;
use moods_core::{provider::UserRegistry, store::RecordStore};
use moods_identity::LocalIdentityProvider;
use moods_store_document::DocumentStore;
use moods_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{Backend, ServerConfig};

#[derive(Parser)]
#[command(author, version, about = "Mood tracking API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;
  let store_path = cfg.store.path.as_deref().map(expand_tilde);

  match (cfg.store.backend, store_path) {
    (Backend::Sqlite, Some(path)) => {
      let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      serve(store, cfg).await
    }
    (Backend::Sqlite, None) => {
      tracing::warn!("no store.path set; using an in-memory database");
      let store = SqliteStore::open_in_memory()
        .await
        .context("failed to open in-memory store")?;
      serve(store, cfg).await
    }
    (Backend::Document, Some(path)) => {
      let store = DocumentStore::open(&path)
        .await
        .with_context(|| format!("failed to open document snapshot at {path:?}"))?;
      serve(store, cfg).await
    }
    (Backend::Document, None) => {
      tracing::warn!("no store.path set; documents will not be persisted");
      serve(DocumentStore::in_memory(), cfg).await
    }
  }
}

async fn serve<S>(store: S, cfg: ServerConfig) -> anyhow::Result<()>
where
  S: RecordStore + UserRegistry + 'static,
{
  let store = Arc::new(store);
  let provider = LocalIdentityProvider::new(store.clone(), cfg.identity.clone())
    .context("failed to build identity provider")?;

  let address = cfg.address();
  let app = moods_api::router(AppState::new(store, Arc::new(provider), cfg.api));

  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!(backend = ?cfg.store.backend, "Listening on http://{address}");

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tilde_only_expands_as_a_prefix() {
    let plain = Path::new("/var/lib/moods.db");
    assert_eq!(expand_tilde(plain), plain);
    assert_eq!(expand_tilde(Path::new("data/~/x")), Path::new("data/~/x"));
  }
}
