//! SQLite backend for the moods store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements both
//! [`RecordStore`](moods_core::store::RecordStore) (ordering and paging in
//! SQL) and [`UserRegistry`](moods_core::provider::UserRegistry).

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
