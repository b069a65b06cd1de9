//! Document-oriented backend for the moods store.
//!
//! Records are schemaless documents keyed by id inside a per-collection
//! map, with last-write-wins semantics and no secondary indexes. Lists come
//! back owner-filtered but unordered, so the
//! [`OwnerScope`](moods_core::access::OwnerScope) sorts and pages them.
//!
//! The store lives in memory. When opened with a path it also keeps a JSON
//! snapshot on disk, rewritten after every mutation.

mod document;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::DocumentStore;
