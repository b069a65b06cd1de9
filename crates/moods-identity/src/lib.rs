//! A self-hosted identity provider for the moods backend.
//!
//! [`LocalIdentityProvider`] implements
//! [`IdentityProvider`](moods_core::provider::IdentityProvider) on top of any
//! [`UserRegistry`](moods_core::provider::UserRegistry). It issues the two
//! token shapes the credential verifier understands:
//!
//! - **identity assertions**: HS256 JWTs carrying `sub` and `email`, signed
//!   with the assertion key and checked against issuer, audience and expiry;
//! - **handoff tokens**: JWTs carrying the subject in a `uid` claim, signed
//!   with a separate handoff key that the verifier never checks.

mod claims;
mod config;
mod password;
mod provider;

pub mod error;

pub use config::IdentityConfig;
pub use error::{Error, Result};
pub use provider::LocalIdentityProvider;
