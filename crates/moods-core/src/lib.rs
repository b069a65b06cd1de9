//! Core types and trait definitions for the moods tracking backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the credential verifier, the identity-provider and storage
//! interfaces, and the owner-scoped accessor that every storage backend is
//! driven through.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod error;
pub mod identity;
pub mod provider;
pub mod resource;
pub mod store;
pub mod token;
pub mod verify;

pub use error::{Error, Result};
pub use identity::{AuthFailure, Identity};

#[cfg(test)]
pub(crate) mod testing;
